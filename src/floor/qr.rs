use std::io::Cursor;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode, render::svg};
use uuid::Uuid;

use crate::error::AppResult;

/// The address guests land on when they scan a table's code.
pub fn table_menu_url(base_url: &str, restaurant_id: Uuid, table_id: Uuid) -> String {
    format!(
        "{}/restaurants/{}/tables/{}",
        base_url.trim_end_matches('/'),
        restaurant_id,
        table_id
    )
}

fn encode(payload: &str) -> AppResult<QrCode> {
    Ok(QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)?)
}

pub fn render_svg(payload: &str, size: u32) -> AppResult<String> {
    let code = encode(payload)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(size, size)
        .quiet_zone(true)
        .build())
}

pub fn render_png(payload: &str, size: u32) -> AppResult<Vec<u8>> {
    let code = encode(payload)?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .quiet_zone(true)
        .build();

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn png_file_name(table_number: i32) -> String {
    format!("table-{table_number}-qr.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_restaurant_and_table() {
        let restaurant = Uuid::nil();
        let table = Uuid::from_u128(1);
        assert_eq!(
            table_menu_url("https://paycamenu.com/", restaurant, table),
            "https://paycamenu.com/restaurants/00000000-0000-0000-0000-000000000000/tables/00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn renders_svg_and_png() {
        let url = table_menu_url("https://paycamenu.com", Uuid::nil(), Uuid::nil());

        let svg = render_svg(&url, 128).unwrap();
        assert!(svg.contains("<svg"));

        let png = render_png(&url, 128).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(png_file_name(7), "table-7-qr.png");
    }
}
