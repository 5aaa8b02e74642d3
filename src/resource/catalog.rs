//! The resource catalog: every administrative table and how it is exposed.

use super::types::*;
use crate::error::AppError;
use crate::policy::{MutationGate, ReadPolicy};
use rust_decimal::Decimal;

const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "png", "jpg", "gif"];

pub const ITEM_CONDITIONS: &[&str] = &["Baik", "Rusak Ringan", "Rusak Berat"];
pub const CONTENT_KINDS: &[&str] = &["artikel", "gambar", "video"];
pub const CONTENT_STATUSES: &[&str] = &["draft", "publish"];
pub const CASH_FLOW_KINDS: &[&str] = &["pemasukan", "pengeluaran"];

const ITEM_CATEGORY: Relation = Relation {
    key: "kategori",
    table: "kategori_barang",
    columns: &["id", "nama_kategori"],
};

const POSITION: Relation = Relation {
    key: "jabatan",
    table: "jabatan",
    columns: &["id", "nama_jabatan"],
};

const FINANCE_CATEGORY: Relation = Relation {
    key: "kategori_keuangan",
    table: "kategori_keuangan",
    columns: &["id", "nama_kategori", "jenis_kategori"],
};

/// Immutable set of resource definitions, shared behind an `Arc`.
#[derive(Clone, Debug)]
pub struct Catalog {
    resources: Vec<ResourceDef>,
}

impl Catalog {
    pub fn new(resources: Vec<ResourceDef>) -> Self {
        Catalog { resources }
    }

    /// The mosque administration resources.
    pub fn standard() -> Self {
        Catalog::new(vec![
            identity(),
            item_category(),
            inventory(),
            staff(),
            position(),
            roster(ResourceKind::Muadzin, "muadzin", "nama_muadzin", "Nama muadzin"),
            roster(ResourceKind::Khatib, "khatib", "nama_khatib", "Nama khatib"),
            content(),
            agenda(),
            finance_category(),
            transaction(),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDef> {
        self.resources.iter()
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.kind == kind)
    }

    /// Like `get`, for handlers bound to one resource.
    pub fn resource(&self, kind: ResourceKind) -> Result<&ResourceDef, AppError> {
        self.get(kind)
            .ok_or_else(|| AppError::Unexpected(format!("resource {:?} not registered", kind)))
    }

    pub fn by_path(&self, segment: &str) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.path_segment == segment)
    }
}

fn identity() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Identity,
        path_segment: "identitas",
        table: "identitas_masjid",
        label: "identitas masjid",
        fields: vec![
            FieldDef::text("nama_masjid", "Nama masjid").required().max(255),
            FieldDef::text("alamat", "Alamat").required(),
            FieldDef::text("no_telepon", "Nomor telepon").max(20),
            FieldDef::text("email", "Email").email().max(255),
            FieldDef::text("url_website", "URL website").url().max(255),
            FieldDef::upload(
                "logo_path",
                "logo",
                "Logo",
                FileRule {
                    bucket: "masjid-logos",
                    extensions: IMAGE_EXTENSIONS,
                    max_kb: 2048,
                },
                "logo_url",
            ),
            FieldDef::text("deskripsi_singkat", "Deskripsi singkat"),
            FieldDef::updater(),
        ],
        list: ListOptions {
            default_sort: ("id", SortOrder::Asc),
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::Open,
        public_read: true,
        singleton: true,
        delete_guard: None,
    }
}

fn item_category() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::ItemCategory,
        path_segment: "kategori-barang",
        table: "kategori_barang",
        label: "kategori barang",
        fields: vec![
            FieldDef::text("nama_kategori", "Nama kategori").required().max(255).unique(),
            FieldDef::text("deskripsi", "Deskripsi").max(1000),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["nama_kategori", "deskripsi"],
            allow_all: true,
            ..ListOptions::default()
        },
        mutation: MutationGate::AnyAuthenticated,
        read: ReadPolicy::Open,
        public_read: false,
        singleton: false,
        delete_guard: Some(DeleteGuard {
            table: "inventaris_barang",
            column: "kategori_id",
            subject: "Kategori",
            dependents: "item inventaris",
        }),
    }
}

fn inventory() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Inventory,
        path_segment: "inventaris",
        table: "inventaris_barang",
        label: "inventaris",
        fields: vec![
            FieldDef::text("nama_barang", "Nama barang").required().max(255),
            FieldDef::reference("kategori_id", "Kategori", ITEM_CATEGORY).required(),
            FieldDef::date("tanggal_masuk", "Tanggal masuk").required(),
            FieldDef::integer("jumlah", "Jumlah").required().min(Decimal::ONE),
            FieldDef::text("kondisi", "Kondisi").required().one_of(ITEM_CONDITIONS),
            FieldDef::text("deskripsi", "Deskripsi"),
            FieldDef::upload(
                "gambar_path",
                "gambar",
                "Gambar",
                FileRule {
                    bucket: "inventaris",
                    extensions: IMAGE_EXTENSIONS,
                    max_kb: 2048,
                },
                "gambar_url",
            ),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["nama_barang"],
            filters: vec![FilterDef::same("kategori_id"), FilterDef::same("kondisi")],
            date_field: Some("tanggal_masuk"),
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::Open,
        public_read: true,
        singleton: false,
        delete_guard: None,
    }
}

fn staff() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Staff,
        path_segment: "pengurus",
        table: "pengurus_masjid",
        label: "pengurus",
        fields: vec![
            FieldDef::text("nama_pengurus", "Nama pengurus").required().max(255),
            FieldDef::reference("jabatan_id", "Jabatan", POSITION).required(),
            FieldDef::text("no_telepon", "Nomor telepon").max(20),
            FieldDef::text("email", "Email").email().max(255),
            FieldDef::text("alamat", "Alamat"),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["nama_pengurus"],
            filters: vec![FilterDef::same("jabatan_id")],
            default_sort: ("nama_pengurus", SortOrder::Asc),
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::Open,
        public_read: true,
        singleton: false,
        delete_guard: None,
    }
}

fn position() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Position,
        path_segment: "jabatan",
        table: "jabatan",
        label: "jabatan",
        fields: vec![
            FieldDef::text("nama_jabatan", "Nama jabatan").required().max(255).unique(),
            FieldDef::text("deskripsi", "Deskripsi"),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["nama_jabatan"],
            default_sort: ("nama_jabatan", SortOrder::Asc),
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::Open,
        public_read: false,
        singleton: false,
        delete_guard: None,
    }
}

/// Muadzin and khatib share one shape: a name, a phone number and an address.
fn roster(
    kind: ResourceKind,
    segment: &'static str,
    name_column: &'static str,
    name_label: &'static str,
) -> ResourceDef {
    let search: &'static [&'static str] = match kind {
        ResourceKind::Muadzin => &["nama_muadzin"],
        _ => &["nama_khatib"],
    };
    ResourceDef {
        kind,
        path_segment: segment,
        table: segment,
        label: segment,
        fields: vec![
            FieldDef::text(name_column, name_label).required().max(255),
            FieldDef::text("no_telepon", "Nomor telepon").max(20),
            FieldDef::text("alamat", "Alamat"),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search,
            default_sort: (name_column, SortOrder::Asc),
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::Open,
        public_read: true,
        singleton: false,
        delete_guard: None,
    }
}

fn content() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Content,
        path_segment: "konten",
        table: "konten_masjid",
        label: "konten",
        fields: vec![
            FieldDef::text("judul", "Judul").required().max(255),
            FieldDef::text("slug", "Slug")
                .max(255)
                .unique()
                .derived(Derivation::Slug { from: "judul" }),
            FieldDef::text("jenis_konten", "Jenis konten").required().one_of(CONTENT_KINDS),
            FieldDef::text("konten_teks", "Konten teks"),
            FieldDef::upload(
                "file_path",
                "file",
                "File",
                FileRule {
                    bucket: "konten-masjid",
                    extensions: &[],
                    max_kb: 10240,
                },
                "file_url",
            ),
            FieldDef::text("status", "Status")
                .one_of(CONTENT_STATUSES)
                .default_text("draft"),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["judul"],
            filters: vec![FilterDef::same("jenis_konten")],
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::PublishedOnly {
            column: "status",
            value: "publish",
        },
        public_read: true,
        singleton: false,
        delete_guard: None,
    }
}

fn agenda() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Agenda,
        path_segment: "agenda",
        table: "agenda_masjid",
        label: "agenda",
        fields: vec![
            FieldDef::text("nama_kegiatan", "Nama kegiatan").required().max(255),
            FieldDef::date("tanggal", "Tanggal").required(),
            FieldDef::time("waktu", "Waktu").required(),
            FieldDef::text("deskripsi", "Deskripsi"),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["nama_kegiatan"],
            date_field: Some("tanggal"),
            default_sort: ("tanggal", SortOrder::Asc),
            ..ListOptions::default()
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::Open,
        public_read: true,
        singleton: false,
        delete_guard: None,
    }
}

fn finance_category() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::FinanceCategory,
        path_segment: "kategori-keuangan",
        table: "kategori_keuangan",
        label: "kategori keuangan",
        fields: vec![
            FieldDef::text("nama_kategori", "Nama kategori").required().max(255).unique(),
            FieldDef::text("jenis_kategori", "Jenis kategori").one_of(CASH_FLOW_KINDS),
            FieldDef::text("deskripsi", "Deskripsi"),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["nama_kategori"],
            filters: vec![FilterDef::same("jenis_kategori")],
            default_sort: ("nama_kategori", SortOrder::Asc),
            ..ListOptions::default()
        },
        mutation: MutationGate::AnyAuthenticated,
        read: ReadPolicy::Open,
        public_read: false,
        singleton: false,
        delete_guard: None,
    }
}

fn transaction() -> ResourceDef {
    ResourceDef {
        kind: ResourceKind::Transaction,
        path_segment: "transaksi",
        table: "transaksi_keuangan",
        label: "transaksi",
        fields: vec![
            FieldDef::date("tanggal_masehi", "Tanggal masehi").required(),
            FieldDef::text("tanggal_hijriah", "Tanggal hijriah")
                .max(255)
                .derived(Derivation::Hijri {
                    from: "tanggal_masehi",
                }),
            FieldDef::text("jenis_transaksi", "Jenis transaksi")
                .required()
                .one_of(CASH_FLOW_KINDS),
            FieldDef::reference("kategori_keuangan_id", "Kategori keuangan", FINANCE_CATEGORY)
                .required(),
            FieldDef::text("keterangan", "Keterangan").required(),
            FieldDef::decimal("jumlah", "Jumlah")
                .required()
                .min(Decimal::new(1, 2))
                .money("jumlah_formatted"),
            FieldDef::text("sumber_tujuan_dana", "Sumber/tujuan dana")
                .required()
                .max(255),
            FieldDef::upload(
                "bukti_transaksi_path",
                "bukti_transaksi",
                "Bukti transaksi",
                FileRule {
                    bucket: "transaksi",
                    extensions: &["jpeg", "png", "jpg", "gif", "pdf"],
                    max_kb: 5120,
                },
                "bukti_transaksi_url",
            ),
            FieldDef::text("nomor_referensi", "Nomor referensi").max(100),
            FieldDef::creator(),
        ],
        list: ListOptions {
            search: &["keterangan"],
            filters: vec![
                FilterDef::same("jenis_transaksi"),
                FilterDef {
                    param: "kategori_id",
                    column: "kategori_keuangan_id",
                },
            ],
            date_field: Some("tanggal_masehi"),
            default_sort: ("tanggal_masehi", SortOrder::Desc),
            sort_aliases: &[("kategori_id", "kategori_keuangan_id")],
            allow_all: false,
            reduced_keys: &[
                "id",
                "tanggal_masehi",
                "tanggal_hijriah",
                "jenis_transaksi",
                "kategori_keuangan",
                "jumlah",
                "jumlah_formatted",
                "created_at",
            ],
        },
        mutation: MutationGate::AdminOnly,
        read: ReadPolicy::RestrictedForUser,
        public_read: false,
        singleton: false,
        delete_guard: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_is_registered_once() {
        let catalog = Catalog::standard();
        for kind in ResourceKind::ALL {
            assert_eq!(catalog.iter().filter(|r| r.kind == kind).count(), 1, "{:?}", kind);
        }
    }

    #[test]
    fn lookup_by_path_segment() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.by_path("kategori-barang").unwrap().table, "kategori_barang");
        assert_eq!(catalog.by_path("transaksi").unwrap().kind, ResourceKind::Transaction);
        assert!(catalog.by_path("users").is_none());
    }

    #[test]
    fn sort_keys_are_allow_listed() {
        let catalog = Catalog::standard();
        let tx = catalog.get(ResourceKind::Transaction).unwrap();
        assert_eq!(tx.sort_column("kategori_id"), Some("kategori_keuangan_id"));
        assert_eq!(tx.sort_column("jumlah"), Some("jumlah"));
        assert_eq!(tx.sort_column("created_at"), Some("created_at"));
        assert_eq!(tx.sort_column("bukti_transaksi_path"), None);
        assert_eq!(tx.sort_column("created_by"), None);
        assert_eq!(tx.sort_column("password"), None);
    }

    #[test]
    fn only_category_listing_allows_all() {
        let catalog = Catalog::standard();
        let allowing: Vec<_> = catalog
            .iter()
            .filter(|r| r.list.allow_all)
            .map(|r| r.kind)
            .collect();
        assert_eq!(allowing, vec![ResourceKind::ItemCategory]);
    }

    #[test]
    fn content_status_defaults_to_draft() {
        let catalog = Catalog::standard();
        let content = catalog.get(ResourceKind::Content).unwrap();
        let status = content.field("status").unwrap();
        assert_eq!(status.default, Some("draft"));
        assert!(!status.nullable());
    }
}
