//! Declared schemas for the key columns every Pefindo table shares
//!
//! Types declared here are authoritative: `TableSchema::infer` only falls
//! back to value-based inference for columns not listed in any of them.

use super::columns::ColumnType;

/// A named, typed column in a declared schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Field {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Field { name, ty }
    }
}

/// A versioned set of declared fields
#[derive(Debug)]
pub struct DeclaredSchema {
    pub name: &'static str,
    pub version: u32,
    pub fields: &'static [Field],
}

impl DeclaredSchema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// `name/vN`, as recorded on columns typed by this schema
    pub fn tag(&self) -> String {
        format!("{}/v{}", self.name, self.version)
    }
}

// =============================================================================
// Report identity (carried onto every child row)
// =============================================================================

pub static IDENTIFIER_FIELDS: DeclaredSchema = DeclaredSchema {
    name: "identifier",
    version: 1,
    fields: &[
        Field::new("username", ColumnType::String),
        Field::new("nomor_identitas", ColumnType::String),
        Field::new("id_report", ColumnType::String),
        Field::new("tgl_permintaan", ColumnType::Timestamp),
        Field::new("npwp", ColumnType::String),
        Field::new("email", ColumnType::String),
        Field::new("telepon", ColumnType::String),
    ],
};

// =============================================================================
// Facility keys (carried onto history, collateral and guarantor rows)
// =============================================================================

pub static FACILITY_KEY_FIELDS: DeclaredSchema = DeclaredSchema {
    name: "facility_key",
    version: 1,
    fields: &[
        Field::new("nomor_rekening_fasilitas", ColumnType::String),
        Field::new("id_jenis_fasilitas", ColumnType::String),
        Field::new("id_pelapor", ColumnType::String),
        Field::new("id_jenis_pelapor", ColumnType::String),
        Field::new("id_jenis_kredit", ColumnType::String),
        Field::new("id_sifat_kredit", ColumnType::String),
    ],
};

// =============================================================================
// Facility history snapshot
// =============================================================================

/// Fields a synthesized snapshot copies from its facility when no facility
/// in the report carries any history to take the field set from.
pub static HISTORY_SNAPSHOT: DeclaredSchema = DeclaredSchema {
    name: "facility_history_snapshot",
    version: 1,
    fields: &[
        Field::new("periode_data", ColumnType::String),
        Field::new("kolektibilitas", ColumnType::Integer),
        Field::new("plafon", ColumnType::Decimal),
        Field::new("baki_debet", ColumnType::Decimal),
        Field::new("tunggakan_pokok", ColumnType::Decimal),
        Field::new("tunggakan_bunga", ColumnType::Decimal),
        Field::new("jumlah_hari_tunggakan", ColumnType::Integer),
        Field::new("denda", ColumnType::Decimal),
        Field::new("kondisi", ColumnType::String),
    ],
};

/// Columns added to synthesized snapshot rows
pub static SNAPSHOT_DERIVED_FIELDS: DeclaredSchema = DeclaredSchema {
    name: "facility_history_derived",
    version: 1,
    fields: &[
        Field::new("snapshot_order", ColumnType::Integer),
        Field::new("status_tunggakan", ColumnType::Integer),
    ],
};

pub static DECLARED_SCHEMAS: &[&DeclaredSchema] = &[
    &IDENTIFIER_FIELDS,
    &FACILITY_KEY_FIELDS,
    &HISTORY_SNAPSHOT,
    &SNAPSHOT_DERIVED_FIELDS,
];

/// The declared schema listing a canonical column name, and its field
pub fn declared_field(column: &str) -> Option<(&'static DeclaredSchema, &'static Field)> {
    DECLARED_SCHEMAS
        .iter()
        .find_map(|schema| schema.field(column).map(|f| (*schema, f)))
}

/// Look up the declared type of a canonical column name
pub fn declared_type(column: &str) -> Option<ColumnType> {
    declared_field(column).map(|(_, f)| f.ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_type_lookup() {
        assert_eq!(declared_type("tgl_permintaan"), Some(ColumnType::Timestamp));
        assert_eq!(declared_type("id_pelapor"), Some(ColumnType::String));
        assert_eq!(declared_type("status_tunggakan"), Some(ColumnType::Integer));
        assert_eq!(declared_type("skor"), None);
    }

    #[test]
    fn test_declared_field_names_its_schema() {
        let (schema, field) = declared_field("nomor_rekening_fasilitas").unwrap();
        assert_eq!(schema.tag(), "facility_key/v1");
        assert_eq!(field.ty, ColumnType::String);
        assert!(declared_field("skor").is_none());
    }

    #[test]
    fn test_declared_names_are_unique() {
        let mut names: Vec<&str> = DECLARED_SCHEMAS.iter().flat_map(|s| s.names()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
