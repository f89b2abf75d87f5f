use std::env;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::Rng;

const SALES_PEOPLE: [&str; 10] = [
    "Jehu Rudeforth",
    "Van Tuxwell",
    "Gigi Bohling",
    "Jan Morforth",
    "Oby Sorrel",
    "Gunar Cockshoot",
    "Brien Boise",
    "Ches Bonnell",
    "Kelci Walkden",
    "Dennison Crosswaite",
];
const GEOGRAPHIES: [&str; 6] = ["UK", "India", "Australia", "New Zealand", "USA", "Canada"];
const PRODUCTS: [&str; 12] = [
    "Mint Chip Choco",
    "85% Dark Bars",
    "Peanut Butter Cubes",
    "Smooth Sliky Salty",
    "99% Dark & Pure",
    "After Nines",
    "50% Dark Bites",
    "Orange Choco",
    "Eclairs",
    "Drinking Coco",
    "Organic Choco Syrup",
    "White Choc",
];

fn dollars(amount: u32) -> String {
    if amount >= 1000 {
        format!("${},{:03}", amount / 1000, amount % 1000)
    } else {
        format!("${}", amount)
    }
}

/// Writes a synthetic sales file: `data_generator [PATH] [ROWS]`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/sales_1m.csv".to_string());
    let rows: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid row count: {}", n))?,
        None => 1_000_000,
    };

    if let Some(parent) = Path::new(&path).parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(&path).with_context(|| format!("creating {}", path))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "Sales Person,Geography,Product,Date,Sales,Boxes")?;

    let start = NaiveDate::from_ymd_opt(2022, 1, 1).context("invalid start date")?;
    let mut rng = rand::rng();
    for _ in 0..rows {
        let person = SALES_PEOPLE[rng.random_range(0..SALES_PEOPLE.len())];
        let geo = GEOGRAPHIES[rng.random_range(0..GEOGRAPHIES.len())];
        let product = PRODUCTS[rng.random_range(0..PRODUCTS.len())];
        let date = start + Duration::days(rng.random_range(0..240));
        let sales: u32 = rng.random_range(7..20_000);
        let boxes: u32 = rng.random_range(0..500);
        writeln!(
            writer,
            "{},{},{},{},\"{} \",{}",
            person,
            geo,
            product,
            date.format("%d-%b-%y"),
            dollars(sales),
            boxes
        )?;
    }
    writer.flush()?;

    println!("Sample sales CSV generated: {} ({} rows)", path, rows);
    Ok(())
}
