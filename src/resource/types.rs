//! Resource definitions: columns, validation rules, list options and presentation.

use crate::policy::{MutationGate, ReadPolicy};
use rust_decimal::Decimal;

/// The eleven administrative record types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Identity,
    ItemCategory,
    Inventory,
    Staff,
    Position,
    Muadzin,
    Khatib,
    Content,
    Agenda,
    FinanceCategory,
    Transaction,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 11] = [
        ResourceKind::Identity,
        ResourceKind::ItemCategory,
        ResourceKind::Inventory,
        ResourceKind::Staff,
        ResourceKind::Position,
        ResourceKind::Muadzin,
        ResourceKind::Khatib,
        ResourceKind::Content,
        ResourceKind::Agenda,
        ResourceKind::FinanceCategory,
        ResourceKind::Transaction,
    ];
}

/// Storage type of a column. Decides DDL, bind casts and how inputs are parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    Time,
    /// BIGINT foreign key.
    Reference,
    /// Stored path of an uploaded file.
    File,
}

impl FieldKind {
    /// PostgreSQL type used in `$n::type` casts.
    pub fn cast(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::File => "text",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "numeric",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Reference => "bigint",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    Email,
    Url,
}

/// Constraints on an uploaded file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileRule {
    /// Directory under the storage root.
    pub bucket: &'static str,
    /// Accepted lowercase extensions; empty accepts any.
    pub extensions: &'static [&'static str],
    pub max_kb: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationRule {
    pub required: bool,
    pub max_length: Option<usize>,
    pub format: Option<TextFormat>,
    pub allowed: Option<&'static [&'static str]>,
    pub minimum: Option<Decimal>,
    pub unique: bool,
    /// Table whose `id` must match the value.
    pub exists_in: Option<&'static str>,
    pub file: Option<FileRule>,
}

/// Value computed from another column on write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Derivation {
    Slug { from: &'static str },
    Hijri { from: &'static str },
}

/// Where a column's value comes from on write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSource {
    Input,
    /// Multipart part named by `FieldDef::input`; the column stores the path.
    Upload,
    Derived(Derivation),
    /// Caller id, set on create only.
    Creator,
    /// Caller id, set on every write.
    Updater,
}

/// Related row embedded in place of a reference column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
    pub key: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presentation {
    Plain,
    /// Rendered as `{key}` with the public URL of the stored path.
    FileUrl(&'static str),
    /// Rendered as a float plus `{key}` with the rupiah string.
    Money(&'static str),
    Relation(Relation),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    /// Request key (differs from `name` for uploads).
    pub input: &'static str,
    /// Human label used in validation messages.
    pub label: &'static str,
    pub kind: FieldKind,
    pub source: FieldSource,
    pub rule: ValidationRule,
    pub presentation: Presentation,
    /// SQL literal used when the value is omitted.
    pub default: Option<&'static str>,
}

impl FieldDef {
    fn base(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        FieldDef {
            name,
            input: name,
            label,
            kind,
            source: FieldSource::Input,
            rule: ValidationRule::default(),
            presentation: Presentation::Plain,
            default: None,
        }
    }

    pub fn text(name: &'static str, label: &'static str) -> Self {
        Self::base(name, label, FieldKind::Text)
    }

    pub fn integer(name: &'static str, label: &'static str) -> Self {
        Self::base(name, label, FieldKind::Integer)
    }

    pub fn decimal(name: &'static str, label: &'static str) -> Self {
        Self::base(name, label, FieldKind::Decimal)
    }

    pub fn date(name: &'static str, label: &'static str) -> Self {
        Self::base(name, label, FieldKind::Date)
    }

    pub fn time(name: &'static str, label: &'static str) -> Self {
        Self::base(name, label, FieldKind::Time)
    }

    /// Foreign key validated with `exists` and presented as the embedded relation.
    pub fn reference(name: &'static str, label: &'static str, relation: Relation) -> Self {
        let mut f = Self::base(name, label, FieldKind::Reference);
        f.rule.exists_in = Some(relation.table);
        f.presentation = Presentation::Relation(relation);
        f
    }

    /// File column filled from the multipart part `input`.
    pub fn upload(
        name: &'static str,
        input: &'static str,
        label: &'static str,
        rule: FileRule,
        url_key: &'static str,
    ) -> Self {
        let mut f = Self::base(name, label, FieldKind::File);
        f.input = input;
        f.source = FieldSource::Upload;
        f.rule.file = Some(rule);
        f.presentation = Presentation::FileUrl(url_key);
        f
    }

    /// `created_by` stamped with the caller and embedded as `{id, name}`.
    pub fn creator() -> Self {
        let mut f = Self::base("created_by", "Pembuat", FieldKind::Reference);
        f.source = FieldSource::Creator;
        f.presentation = Presentation::Relation(Relation {
            key: "created_by",
            table: "users",
            columns: &["id", "name"],
        });
        f
    }

    /// `updated_by` restamped on every write.
    pub fn updater() -> Self {
        let mut f = Self::base("updated_by", "Pengubah", FieldKind::Reference);
        f.source = FieldSource::Updater;
        f.presentation = Presentation::Relation(Relation {
            key: "updated_by",
            table: "users",
            columns: &["id", "name"],
        });
        f
    }

    pub fn required(mut self) -> Self {
        self.rule.required = true;
        self
    }

    pub fn max(mut self, n: usize) -> Self {
        self.rule.max_length = Some(n);
        self
    }

    pub fn email(mut self) -> Self {
        self.rule.format = Some(TextFormat::Email);
        self
    }

    pub fn url(mut self) -> Self {
        self.rule.format = Some(TextFormat::Url);
        self
    }

    pub fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.rule.allowed = Some(values);
        self
    }

    pub fn min(mut self, value: Decimal) -> Self {
        self.rule.minimum = Some(value);
        self
    }

    pub fn unique(mut self) -> Self {
        self.rule.unique = true;
        self
    }

    pub fn money(mut self, formatted_key: &'static str) -> Self {
        self.presentation = Presentation::Money(formatted_key);
        self
    }

    /// Text default applied by the database when the input is omitted.
    pub fn default_text(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    pub fn derived(mut self, derivation: Derivation) -> Self {
        self.source = FieldSource::Derived(derivation);
        self
    }

    /// Whether the value is read from the request body.
    pub fn is_input(&self) -> bool {
        matches!(self.source, FieldSource::Input | FieldSource::Upload)
    }

    pub fn is_stamp(&self) -> bool {
        matches!(self.source, FieldSource::Creator | FieldSource::Updater)
    }

    /// Column may hold NULL.
    pub fn nullable(&self) -> bool {
        match self.source {
            FieldSource::Creator => false,
            FieldSource::Updater | FieldSource::Upload => true,
            FieldSource::Derived(_) => false,
            FieldSource::Input => !self.rule.required && self.default.is_none(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// `asc` / `desc`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Query parameter compared for equality against a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterDef {
    pub param: &'static str,
    pub column: &'static str,
}

impl FilterDef {
    pub const fn same(column: &'static str) -> Self {
        FilterDef { param: column, column }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListOptions {
    /// Columns searched with `ILIKE`, OR-combined.
    pub search: &'static [&'static str],
    pub filters: Vec<FilterDef>,
    /// Column bounded by `tanggal_dari` / `tanggal_sampai`.
    pub date_field: Option<&'static str>,
    pub default_sort: (&'static str, SortOrder),
    /// Extra `sort_by` keys mapped to a different column.
    pub sort_aliases: &'static [(&'static str, &'static str)],
    /// `all=true` returns every match without pagination.
    pub allow_all: bool,
    /// Output keys kept for a reduced projection.
    pub reduced_keys: &'static [&'static str],
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            search: &[],
            filters: Vec::new(),
            date_field: None,
            default_sort: ("created_at", SortOrder::Desc),
            sort_aliases: &[],
            allow_all: false,
            reduced_keys: &[],
        }
    }
}

/// Blocks deletion while rows in `table` still point at the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteGuard {
    pub table: &'static str,
    pub column: &'static str,
    pub subject: &'static str,
    pub dependents: &'static str,
}

impl DeleteGuard {
    pub fn message(&self, count: i64) -> String {
        format!(
            "{} tidak dapat dihapus karena masih digunakan oleh {} {}",
            self.subject, count, self.dependents
        )
    }
}

/// One administrative resource: table, columns and the rules around them.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceDef {
    pub kind: ResourceKind,
    pub path_segment: &'static str,
    pub table: &'static str,
    /// Noun used in messages ("Data {label} berhasil diambil").
    pub label: &'static str,
    pub fields: Vec<FieldDef>,
    pub list: ListOptions,
    pub mutation: MutationGate,
    pub read: ReadPolicy,
    pub public_read: bool,
    /// At most one row exists.
    pub singleton: bool,
    pub delete_guard: Option<DeleteGuard>,
}

/// Columns every resource table carries besides its declared fields.
pub const SYSTEM_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

impl ResourceDef {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        SYSTEM_COLUMNS.contains(&name) || self.field(name).is_some()
    }

    pub fn input_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_input())
    }

    pub fn upload_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.source == FieldSource::Upload)
    }

    /// Column for a `sort_by` key. System columns, plain input columns and aliases are sortable.
    pub fn sort_column(&self, key: &str) -> Option<&'static str> {
        if let Some(&(_, column)) = self.list.sort_aliases.iter().find(|(k, _)| *k == key) {
            return Some(column);
        }
        if let Some(c) = SYSTEM_COLUMNS.iter().find(|c| **c == key) {
            return Some(*c);
        }
        self.fields
            .iter()
            .find(|f| f.name == key && f.kind != FieldKind::File && !f.is_stamp())
            .map(|f| f.name)
    }

    pub fn messages(&self) -> Messages<'_> {
        Messages { label: self.label }
    }
}

/// Standard envelope messages for a resource.
pub struct Messages<'a> {
    label: &'a str,
}

impl Messages<'_> {
    pub fn fetched(&self) -> String {
        format!("Data {} berhasil diambil", self.label)
    }

    pub fn stored(&self) -> String {
        format!("Data {} berhasil disimpan", self.label)
    }

    pub fn updated(&self) -> String {
        format!("Data {} berhasil diperbarui", self.label)
    }

    pub fn deleted(&self) -> String {
        format!("Data {} berhasil dihapus", self.label)
    }

    pub fn not_found(&self) -> String {
        format!("Data {} tidak ditemukan", self.label)
    }
}
