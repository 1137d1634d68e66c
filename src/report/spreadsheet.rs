//! Spreadsheet report
//!
//! One row per new listing. Prices are written as readable strings and the
//! listing URL as a "Перейти" hyperlink.

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::Path;

use crate::models::CanonicalListing;
use crate::utils::error::ReportError;
use crate::utils::{format_price, is_valid_url, region_slug};

pub const SHEET_NAME: &str = "Объявления";

pub const AREA_HEADER_SQM: &str = "Площадь, кв.м.";
pub const AREA_HEADER_SOTKA: &str = "Площадь, сотки";

const LINK_TEXT: &str = "Перейти";
const MAX_COLUMN_WIDTH: usize = 100;

/// File name for a region's spreadsheet
pub fn spreadsheet_file_name(region: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "realty_report_{}_{}.xlsx",
        region_slug(region),
        timestamp.format("%Y-%m-%d_%H%M%S")
    )
}

/// Area column header: sotka when any listing is a land parcel
pub fn area_header(listings: &[CanonicalListing]) -> &'static str {
    if listings.iter().any(CanonicalListing::is_land) {
        AREA_HEADER_SOTKA
    } else {
        AREA_HEADER_SQM
    }
}

/// Column headers in output order
pub fn headers(listings: &[CanonicalListing]) -> [&'static str; 7] {
    [
        "Адрес",
        "Категория",
        area_header(listings),
        "Цена за кв.м.",
        "Итоговая цена",
        "Описание",
        "Ссылка на объявление",
    ]
}

/// Write the spreadsheet for `listings` to `path`
pub fn write_spreadsheet(listings: &[CanonicalListing], path: &Path) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new().set_bold();
    let headers = headers(listings);
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (idx, listing) in listings.iter().enumerate() {
        let row = (idx + 1) as u32;
        let cells = [
            listing.address.clone(),
            listing.category_name.clone(),
            listing.area.to_string(),
            format_price(listing.price_per_unit_area),
            format_price(listing.price),
            listing.description.clone(),
            listing.url.clone(),
        ];

        worksheet.write_string(row, 0, &cells[0])?;
        worksheet.write_string(row, 1, &cells[1])?;
        worksheet.write_number(row, 2, listing.area)?;
        worksheet.write_string(row, 3, &cells[3])?;
        worksheet.write_string(row, 4, &cells[4])?;
        worksheet.write_string(row, 5, &cells[5])?;
        write_link(worksheet, row, 6, &listing.url)?;

        for (col, value) in cells.iter().enumerate() {
            widths[col] = widths[col].max(value.chars().count());
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (*width).min(MAX_COLUMN_WIDTH) + 2;
        worksheet.set_column_width(col as u16, width as f64)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_link(worksheet: &mut Worksheet, row: u32, col: u16, url: &str) -> Result<(), ReportError> {
    if is_valid_url(url) {
        worksheet.write_url_with_text(row, col, url, LINK_TEXT)?;
    } else {
        worksheet.write_string(row, col, url)?;
    }
    Ok(())
}
