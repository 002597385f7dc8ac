//! CSV rendering of catalog lists.
//!
//! Rows follow the order of the slice passed in, so exporting
//! [`crate::CatalogStore::current_view`] yields what the operator sees.

use chrono::SecondsFormat;

use crate::model::{Category, MenuItem};

pub const CATEGORY_HEADER: [&str; 8] = [
    "ID",
    "Name",
    "Description",
    "Items Count",
    "Status",
    "Created At",
    "Image",
    "Subcategories",
];

pub const MENU_ITEM_HEADER: [&str; 9] = [
    "ID",
    "Name",
    "Description",
    "Price",
    "Status",
    "Stock",
    "Category",
    "Subcategory",
    "Image",
];

/// Quote a field when it holds a separator, a quote or a line break.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_row<S: AsRef<str>>(out: &mut String, fields: &[S]) {
    let row: Vec<String> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

pub fn categories_csv(categories: &[Category]) -> String {
    let mut out = String::new();
    write_row(&mut out, &CATEGORY_HEADER);
    for c in categories {
        let subcategories: Vec<&str> = c.subcategories.iter().map(|s| s.name.as_str()).collect();
        write_row(
            &mut out,
            &[
                c.id.clone(),
                c.name.clone(),
                c.description.clone(),
                c.items_count.to_string(),
                c.status.as_title().to_string(),
                c.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                c.image.url().unwrap_or_default().to_string(),
                subcategories.join("; "),
            ],
        );
    }
    out
}

pub fn menu_items_csv(items: &[MenuItem]) -> String {
    let mut out = String::new();
    write_row(&mut out, &MENU_ITEM_HEADER);
    for item in items {
        write_row(
            &mut out,
            &[
                item.id.clone(),
                item.name.clone(),
                item.description.clone(),
                format!("{:.2}", item.price),
                item.status.as_lower().to_string(),
                item.stock.as_str().to_string(),
                item.category_name.clone(),
                item.sub_category.clone().unwrap_or_default(),
                item.image.url().unwrap_or_default().to_string(),
            ],
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{category, item, sub};
    use crate::model::{ImageRef, StockLevel};

    #[test]
    fn category_rows_escape_text_fields() {
        let mut drinks = category("c1", "Drinks, cold", 5);
        drinks.description = "Say \"cheers\"\nand sip".into();
        drinks.subcategories = vec![sub("s1", "Soda"), sub("s2", "Juice")];
        let csv = categories_csv(&[drinks]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ID,Name,Description,Items Count,Status,Created At,Image,Subcategories")
        );
        assert_eq!(
            csv.split_once('\n').map(|(_, rest)| rest),
            Some(
                "c1,\"Drinks, cold\",\"Say \"\"cheers\"\"\nand sip\",5,Active,\
                 2024-03-01T12:00:00.000Z,https://cdn.example.com/c1.jpg,Soda; Juice\n"
            )
        );
    }

    #[test]
    fn unsaved_upload_exports_empty_image_cell() {
        let mut drinks = category("c1", "Drinks", 5);
        drinks.image = ImageRef::from_input("data:image/png;base64,aGVsbG8=");
        let csv = categories_csv(&[drinks]);
        assert_eq!(
            csv.lines().nth(1),
            Some("c1,Drinks,Drinks description,5,Active,2024-03-01T12:00:00.000Z,,")
        );

        let mut cola = item("p1", "Cola", "c1");
        cola.image = ImageRef::from_input("data:image/png;base64,aGVsbG8=");
        assert!(menu_items_csv(&[cola]).lines().nth(1).unwrap().ends_with(",,"));
    }

    #[test]
    fn empty_list_is_header_only() {
        assert_eq!(categories_csv(&[]).lines().count(), 1);
        assert_eq!(menu_items_csv(&[]).lines().count(), 1);
    }

    #[test]
    fn menu_item_rows() {
        let mut cola = item("p1", "Cola", "c1");
        cola.category_name = "Drinks".into();
        cola.sub_category = Some("s1".into());
        cola.stock = StockLevel::LowStock;
        let csv = menu_items_csv(&[cola]);
        assert_eq!(
            csv.lines().nth(1),
            Some("p1,Cola,Cola description,4.50,active,Low Stock,Drinks,s1,")
        );
    }
}
