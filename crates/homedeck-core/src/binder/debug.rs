// Characteristic debug table.
//
// When debug mode is on, every fragment carries a table of all
// characteristics. It is refreshed from write acknowledgements, which
// report the server's view of each updated characteristic.

use super::fragment::DebugRow;
use crate::backend::WriteAck;
use crate::model::DeviceDescriptor;

/// One row per characteristic of `descriptor`, in server order.
pub fn rows_for(descriptor: &DeviceDescriptor) -> Vec<DebugRow> {
    descriptor
        .characteristics()
        .iter()
        .map(|c| DebugRow {
            field: c.kind.clone(),
            description: c.label().to_owned(),
            value: c.value.map(|v| v.to_string()).unwrap_or_default(),
        })
        .collect()
}

/// Fold an acknowledgement into existing rows. Characteristics the table
/// has not seen yet are appended.
pub fn merge_ack(rows: &[DebugRow], ack: &WriteAck) -> Vec<DebugRow> {
    let mut rows = rows.to_vec();
    for (field, value) in &ack.updated {
        let description = ack
            .descriptions
            .iter()
            .find(|(k, _)| k == field)
            .map_or(field.as_str(), |(_, d)| d.as_str());
        match rows.iter_mut().find(|r| &r.field == field) {
            Some(row) => {
                row.value = value.to_string();
                description.clone_into(&mut row.description);
            }
            None => rows.push(DebugRow {
                field: field.clone(),
                description: description.to_owned(),
                value: value.to_string(),
            }),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Characteristic, FieldMap};
    use pretty_assertions::assert_eq;

    #[test]
    fn ack_updates_and_appends_rows() {
        let d = DeviceDescriptor::new("d1", "Lightbulb").with_characteristic(
            Characteristic::new("Brightness", 40).with_description("Brightness"),
        );
        let rows = rows_for(&d);
        assert_eq!(rows[0].value, "40");

        let mut updated = FieldMap::new();
        updated.insert("Brightness".into(), 80.into());
        updated.insert("On".into(), 1.into());
        let ack = WriteAck {
            updated,
            descriptions: vec![("On".into(), "Power State".into())],
        };

        let merged = merge_ack(&rows, &ack);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, "80");
        assert_eq!(merged[1].description, "Power State");
        assert_eq!(merged[1].value, "1");
    }
}
