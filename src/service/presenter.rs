//! Maps stored rows to the external JSON shape of each resource.

use super::crud::Row;
use crate::format::{as_float, rupiah};
use crate::resource::{Presentation, ResourceDef};
use crate::settings::Settings;
use crate::sql::relation_alias;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::str::FromStr;

/// Presented row: `id`, each field in catalog order, then the timestamps.
/// References become the embedded related object, file paths become public URLs
/// and money columns a float plus the rupiah string.
pub fn present(def: &ResourceDef, row: &Row, settings: &Settings) -> Row {
    let mut out = Row::new();
    out.insert("id".into(), row.get("id").cloned().unwrap_or(Value::Null));
    for field in &def.fields {
        let raw = row.get(field.name).cloned().unwrap_or(Value::Null);
        match field.presentation {
            Presentation::Plain => {
                out.insert(field.name.into(), raw);
            }
            Presentation::FileUrl(key) => {
                let url = raw
                    .as_str()
                    .filter(|p| !p.is_empty())
                    .map(|p| Value::String(settings.file_url(p)))
                    .unwrap_or(Value::Null);
                out.insert(key.into(), url);
            }
            Presentation::Money(formatted_key) => {
                let amount = decimal_of(&raw);
                out.insert(
                    field.name.into(),
                    amount.map(money_number).unwrap_or(Value::Null),
                );
                out.insert(
                    formatted_key.into(),
                    amount.map(|d| Value::String(rupiah(d))).unwrap_or(Value::Null),
                );
            }
            Presentation::Relation(rel) => {
                let embedded = row
                    .get(&relation_alias(field.name))
                    .cloned()
                    .unwrap_or(Value::Null);
                out.insert(rel.key.into(), embedded);
            }
        }
    }
    for ts in ["created_at", "updated_at"] {
        out.insert(ts.into(), row.get(ts).cloned().unwrap_or(Value::Null));
    }
    out
}

pub fn present_all(def: &ResourceDef, rows: &[Row], settings: &Settings) -> Vec<Row> {
    rows.iter().map(|r| present(def, r, settings)).collect()
}

/// Keeps only the resource's reduced key set.
pub fn reduce(def: &ResourceDef, presented: Row) -> Row {
    presented
        .into_iter()
        .filter(|(k, _)| def.list.reduced_keys.contains(&k.as_str()))
        .collect()
}

/// Numeric or textual decimal cell.
pub fn decimal_of(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

pub fn money_number(amount: Decimal) -> Value {
    Number::from_f64(as_float(amount))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Catalog, ResourceKind};
    use serde_json::json;

    fn def(kind: ResourceKind) -> ResourceDef {
        Catalog::standard().get(kind).cloned().unwrap()
    }

    fn row(v: Value) -> Row {
        v.as_object().cloned().unwrap()
    }

    fn settings() -> Settings {
        Settings {
            public_base_url: "https://masjid.example".into(),
            ..Settings::default()
        }
    }

    fn transaction_row() -> Row {
        row(json!({
            "id": 12,
            "tanggal_masehi": "2025-01-15",
            "tanggal_hijriah": "15 Rajab 1446 H",
            "jenis_transaksi": "pemasukan",
            "kategori_keuangan_id": 3,
            "kategori_keuangan_id__rel": {"id": 3, "nama_kategori": "Infaq", "jenis_kategori": "pemasukan"},
            "keterangan": "Infaq Jumat",
            "jumlah": "1500000.50",
            "sumber_tujuan_dana": "Jamaah",
            "bukti_transaksi_path": "transaksi/abc.pdf",
            "nomor_referensi": null,
            "created_by": 1,
            "created_by__rel": {"id": 1, "name": "Admin"},
            "created_at": "2025-01-15 08:00:00",
            "updated_at": "2025-01-15 08:00:00"
        }))
    }

    #[test]
    fn transaction_shape() {
        let tx = def(ResourceKind::Transaction);
        let out = present(&tx, &transaction_row(), &settings());
        assert_eq!(
            Value::Object(out.clone()),
            json!({
                "id": 12,
                "tanggal_masehi": "2025-01-15",
                "tanggal_hijriah": "15 Rajab 1446 H",
                "jenis_transaksi": "pemasukan",
                "kategori_keuangan": {"id": 3, "nama_kategori": "Infaq", "jenis_kategori": "pemasukan"},
                "keterangan": "Infaq Jumat",
                "jumlah": 1500000.5,
                "jumlah_formatted": "Rp 1.500.001",
                "sumber_tujuan_dana": "Jamaah",
                "bukti_transaksi_url": "https://masjid.example/storage/transaksi/abc.pdf",
                "nomor_referensi": null,
                "created_by": {"id": 1, "name": "Admin"},
                "created_at": "2025-01-15 08:00:00",
                "updated_at": "2025-01-15 08:00:00"
            })
        );
        let keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(keys.first().map(String::as_str), Some("id"));
        assert_eq!(keys.last().map(String::as_str), Some("updated_at"));
    }

    #[test]
    fn reduced_projection_for_users() {
        let tx = def(ResourceKind::Transaction);
        let out = reduce(&tx, present(&tx, &transaction_row(), &settings()));
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "tanggal_masehi",
                "tanggal_hijriah",
                "jenis_transaksi",
                "kategori_keuangan",
                "jumlah",
                "jumlah_formatted",
                "created_at"
            ]
        );
    }

    #[test]
    fn absent_file_and_updater_are_null() {
        let identity = def(ResourceKind::Identity);
        let out = present(
            &identity,
            &row(json!({
                "id": 1,
                "nama_masjid": "Masjid Al-Ikhlas",
                "alamat": "Jl. Merdeka 1",
                "logo_path": null,
                "updated_by": null,
                "updated_by__rel": null,
                "created_at": "2025-01-01 00:00:00",
                "updated_at": "2025-01-01 00:00:00"
            })),
            &settings(),
        );
        assert_eq!(out["logo_url"], Value::Null);
        assert_eq!(out["updated_by"], Value::Null);
        assert_eq!(out["no_telepon"], Value::Null);
        assert!(!out.contains_key("logo_path"));
    }

    #[test]
    fn inventory_embeds_category() {
        let inv = def(ResourceKind::Inventory);
        let out = present(
            &inv,
            &row(json!({
                "id": 4,
                "nama_barang": "Karpet",
                "kategori_id": 2,
                "kategori_id__rel": {"id": 2, "nama_kategori": "Perlengkapan"},
                "jumlah": 10,
                "gambar_path": "inventaris/k.png"
            })),
            &settings(),
        );
        assert_eq!(out["kategori"], json!({"id": 2, "nama_kategori": "Perlengkapan"}));
        assert_eq!(out["jumlah"], json!(10));
        assert_eq!(out["gambar_url"], json!("https://masjid.example/storage/inventaris/k.png"));
        assert!(!out.contains_key("kategori_id"));
    }

    #[test]
    fn decimal_cells() {
        assert_eq!(decimal_of(&json!("12.50")), Decimal::from_str("12.50").ok());
        assert_eq!(decimal_of(&json!(7)), Some(Decimal::from(7)));
        assert_eq!(decimal_of(&json!(null)), None);
        assert_eq!(money_number(Decimal::from_str("2500.75").unwrap()), json!(2500.75));
    }
}
