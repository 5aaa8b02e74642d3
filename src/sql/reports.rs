//! Aggregate queries behind the dashboard, the financial recap and the category statistics.

use super::builder::{quoted, QueryBuf};
use crate::resource::ResourceDef;
use crate::sql::PgBindValue;
use chrono::NaiveDate;

/// `jenis_transaksi, total` with the summed amount as text, for transactions dated in `[from, to]`.
pub fn totals_by_kind(transactions: &ResourceDef, from: NaiveDate, to: NaiveDate) -> QueryBuf {
    let mut q = QueryBuf::new();
    let from_ph = q.placeholder(PgBindValue::Date(from), "date");
    let to_ph = q.placeholder(PgBindValue::Date(to), "date");
    q.sql = format!(
        "SELECT \"jenis_transaksi\", COALESCE(SUM(\"jumlah\"), 0)::text AS \"total\" FROM {} \
         WHERE \"tanggal_masehi\" >= {} AND \"tanggal_masehi\" <= {} GROUP BY \"jenis_transaksi\"",
        quoted(transactions.table),
        from_ph,
        to_ph
    );
    q
}

/// Per finance category sums over `[from, to]`, ordered by category name.
pub fn totals_by_category(
    transactions: &ResourceDef,
    categories: &ResourceDef,
    from: NaiveDate,
    to: NaiveDate,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let from_ph = q.placeholder(PgBindValue::Date(from), "date");
    let to_ph = q.placeholder(PgBindValue::Date(to), "date");
    q.sql = format!(
        "SELECT k.\"nama_kategori\", k.\"jenis_kategori\", SUM(t.\"jumlah\")::text AS \"total\" \
         FROM {} t JOIN {} k ON k.\"id\" = t.\"kategori_keuangan_id\" \
         WHERE t.\"tanggal_masehi\" >= {} AND t.\"tanggal_masehi\" <= {} \
         GROUP BY k.\"id\", k.\"nama_kategori\", k.\"jenis_kategori\" \
         ORDER BY k.\"nama_kategori\" ASC, k.\"id\" ASC",
        quoted(transactions.table),
        quoted(categories.table),
        from_ph,
        to_ph
    );
    q
}

/// Item count and quantity per item category, including empty categories.
pub fn item_totals_per_category(categories: &ResourceDef, items: &ResourceDef) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT k.\"id\", k.\"nama_kategori\", COUNT(i.\"id\") AS \"total_items\", \
         COALESCE(SUM(i.\"jumlah\"), 0)::bigint AS \"total_quantity\" \
         FROM {} k LEFT JOIN {} i ON i.\"kategori_id\" = k.\"id\" \
         GROUP BY k.\"id\", k.\"nama_kategori\" ORDER BY k.\"id\" ASC",
        quoted(categories.table),
        quoted(items.table)
    );
    q
}

/// Totals for one item category, with one count column per condition in `conditions`
/// aliased by the matching entry of `aliases`.
pub fn item_breakdown(
    items: &ResourceDef,
    category_id: i64,
    conditions: &[&str],
    aliases: &[&str],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = vec![
        "COUNT(*) AS \"total_barang\"".to_string(),
        "COALESCE(SUM(\"jumlah\"), 0)::bigint AS \"total_jumlah\"".to_string(),
    ];
    for (condition, alias) in conditions.iter().zip(aliases) {
        let ph = q.placeholder(PgBindValue::Text(condition.to_string()), "text");
        cols.push(format!(
            "COUNT(*) FILTER (WHERE \"kondisi\" = {}) AS {}",
            ph,
            quoted(alias)
        ));
    }
    let id_ph = q.placeholder(PgBindValue::I64(category_id), "bigint");
    q.sql = format!(
        "SELECT {} FROM {} WHERE \"kategori_id\" = {}",
        cols.join(", "),
        quoted(items.table),
        id_ph
    );
    q
}

/// Plain column projection for dropdown lists.
pub fn select_columns(table: &str, columns: &[&str], order_by: Option<&str>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    let order = match order_by {
        Some(c) => format!(" ORDER BY {} ASC, \"id\" ASC", quoted(c)),
        None => " ORDER BY \"id\" ASC".to_string(),
    };
    q.sql = format!("SELECT {} FROM {}{}", cols, quoted(table), order);
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Catalog, ResourceKind};

    fn def(kind: ResourceKind) -> ResourceDef {
        Catalog::standard().get(kind).cloned().unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn kind_totals_bind_the_period() {
        let q = totals_by_kind(&def(ResourceKind::Transaction), ymd(2025, 1, 1), ymd(2025, 1, 31));
        assert!(q.sql.contains("FROM \"transaksi_keuangan\""));
        assert!(q.sql.contains("\"tanggal_masehi\" >= $1::date AND \"tanggal_masehi\" <= $2::date"));
        assert!(q.sql.ends_with("GROUP BY \"jenis_transaksi\""));
        assert_eq!(
            q.params,
            vec![PgBindValue::Date(ymd(2025, 1, 1)), PgBindValue::Date(ymd(2025, 1, 31))]
        );
    }

    #[test]
    fn category_totals_join_finance_categories() {
        let q = totals_by_category(
            &def(ResourceKind::Transaction),
            &def(ResourceKind::FinanceCategory),
            ymd(2025, 1, 1),
            ymd(2025, 12, 31),
        );
        assert!(q
            .sql
            .contains("FROM \"transaksi_keuangan\" t JOIN \"kategori_keuangan\" k ON k.\"id\" = t.\"kategori_keuangan_id\""));
    }

    #[test]
    fn breakdown_counts_each_condition() {
        let q = item_breakdown(
            &def(ResourceKind::Inventory),
            5,
            &["Baik", "Rusak Ringan"],
            &["kondisi_baik", "kondisi_rusak_ringan"],
        );
        assert!(q.sql.contains("COUNT(*) FILTER (WHERE \"kondisi\" = $1::text) AS \"kondisi_baik\""));
        assert!(q.sql.contains("COUNT(*) FILTER (WHERE \"kondisi\" = $2::text) AS \"kondisi_rusak_ringan\""));
        assert!(q.sql.ends_with("WHERE \"kategori_id\" = $3::bigint"));
        assert_eq!(q.params.last(), Some(&PgBindValue::I64(5)));
    }

    #[test]
    fn option_projection() {
        let q = select_columns("kategori_barang", &["id", "nama_kategori"], Some("nama_kategori"));
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"nama_kategori\" FROM \"kategori_barang\" ORDER BY \"nama_kategori\" ASC, \"id\" ASC"
        );
    }
}
