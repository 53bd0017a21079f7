//! Voter record model and XML response decoding.
//!
//! The CEEPUR `ConsultaElectorById` service answers every lookup with an
//! `<Elector>` XML document. A `NumeroElectoral` of `0` in the body is the
//! service's way of saying the requested voter id does not exist.

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

/// Column holding the voter id in the output file.
pub const ID_COLUMN: &str = "NumeroElectoral";

/// Base columns persisted for every record, in output order.
const BASE_COLUMNS: [&str; 6] = [
    "NumeroElectoral",
    "Category",
    "FechaNacimiento",
    "Precinto",
    "Status",
    "Unidad",
];

/// Extra columns persisted when description saving is enabled.
const DESCRIPTION_COLUMNS: [&str; 2] = ["EstatusDescripcion", "CategoriaDescripcion"];

/// Returns the ordered output columns for a run.
#[must_use]
pub fn columns(save_descriptions: bool) -> Vec<String> {
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(ToString::to_string).collect();
    if save_descriptions {
        columns.extend(DESCRIPTION_COLUMNS.iter().map(ToString::to_string));
    }
    columns
}

/// Errors produced while decoding an `<Elector>` response body.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The body was not a well-formed `<Elector>` document.
    #[error("XML decode failed: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// A numeric field carried a value that does not parse as an integer.
    #[error("field {field} has non-numeric value {value:?}")]
    NumericField {
        /// The wire name of the offending field.
        field: &'static str,
        /// The raw value found in the response.
        value: String,
    },
}

/// Raw `<Elector>` document, every field kept as text.
///
/// The not-found sentinel must be checked against the raw string before any
/// numeric conversion, since a sentinel response is not required to carry
/// meaningful values in the remaining fields.
#[derive(Debug, Deserialize)]
#[serde(rename = "Elector")]
struct RawElector {
    #[serde(rename = "NumeroElectoral", default)]
    numero_electoral: String,
    #[serde(rename = "Precinto", default)]
    precinto: String,
    #[serde(rename = "Unidad", default)]
    unidad: String,
    #[serde(rename = "FechaNacimiento", default)]
    fecha_nacimiento: String,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Category", default)]
    category: String,
    #[serde(rename = "Municipio", default)]
    municipio: String,
    #[serde(rename = "EstatusDescripcion", default)]
    estatus_descripcion: String,
    #[serde(rename = "CategoriaDescripcion", default)]
    categoria_descripcion: String,
    #[serde(rename = "Colegio", default)]
    colegio: String,
    #[serde(rename = "Tomo", default)]
    tomo: String,
    #[serde(rename = "Linea", default)]
    linea: String,
}

/// One public voter registry entry, as returned by the service.
///
/// Immutable once constructed; only a subset of the fields is persisted
/// (see [`columns`]), but the full record is kept so callers can inspect
/// everything the service returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterRecord {
    pub numero_electoral: u32,
    pub precinto: u32,
    pub unidad: u32,
    pub fecha_nacimiento: String,
    pub status: String,
    pub category: String,
    pub municipio: String,
    pub estatus_descripcion: String,
    pub categoria_descripcion: String,
    pub colegio: u32,
    pub tomo: u32,
    pub linea: u32,
}

impl VoterRecord {
    /// Projects the record into an output row keyed by column name.
    ///
    /// The row always carries the description fields; the sink ignores keys
    /// outside its configured columns.
    #[must_use]
    pub fn to_row(&self) -> HashMap<String, String> {
        HashMap::from([
            ("NumeroElectoral".to_string(), self.numero_electoral.to_string()),
            ("Category".to_string(), self.category.clone()),
            ("FechaNacimiento".to_string(), self.fecha_nacimiento.clone()),
            ("Precinto".to_string(), self.precinto.to_string()),
            ("Status".to_string(), self.status.clone()),
            ("Unidad".to_string(), self.unidad.to_string()),
            ("EstatusDescripcion".to_string(), self.estatus_descripcion.clone()),
            ("CategoriaDescripcion".to_string(), self.categoria_descripcion.clone()),
        ])
    }
}

fn numeric(field: &'static str, value: &str) -> Result<u32, RecordError> {
    value.trim().parse().map_err(|_| RecordError::NumericField {
        field,
        value: value.to_string(),
    })
}

/// Decodes an `<Elector>` response body.
///
/// Returns `Ok(None)` for the not-found sentinel (`NumeroElectoral` of `0`).
pub fn parse_elector_response(body: &str) -> Result<Option<VoterRecord>, RecordError> {
    let raw: RawElector = quick_xml::de::from_str(body)?;
    if raw.numero_electoral.trim() == "0" {
        return Ok(None);
    }
    Ok(Some(VoterRecord {
        numero_electoral: numeric("NumeroElectoral", &raw.numero_electoral)?,
        precinto: numeric("Precinto", &raw.precinto)?,
        unidad: numeric("Unidad", &raw.unidad)?,
        fecha_nacimiento: raw.fecha_nacimiento,
        status: raw.status,
        category: raw.category,
        municipio: raw.municipio,
        estatus_descripcion: raw.estatus_descripcion,
        categoria_descripcion: raw.categoria_descripcion,
        colegio: numeric("Colegio", &raw.colegio)?,
        tomo: numeric("Tomo", &raw.tomo)?,
        linea: numeric("Linea", &raw.linea)?,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn elector_xml(id: u32) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<Elector xmlns="http://tempuri.org/">
  <NumeroElectoral>{id}</NumeroElectoral>
  <Precinto>77</Precinto>
  <Unidad>12</Unidad>
  <FechaNacimiento>1/1/1970</FechaNacimiento>
  <Status>A</Status>
  <Category>III</Category>
  <Municipio>SAN JUAN</Municipio>
  <EstatusDescripcion>ACTIVO</EstatusDescripcion>
  <CategoriaDescripcion>ELECTOR</CategoriaDescripcion>
  <Colegio>3</Colegio>
  <Tomo>21</Tomo>
  <Linea>14</Linea>
</Elector>"#
        )
    }

    #[test]
    fn parses_full_record() {
        let record = parse_elector_response(&elector_xml(123456))
            .unwrap()
            .expect("record expected");
        assert_eq!(record.numero_electoral, 123456);
        assert_eq!(record.precinto, 77);
        assert_eq!(record.unidad, 12);
        assert_eq!(record.fecha_nacimiento, "1/1/1970");
        assert_eq!(record.status, "A");
        assert_eq!(record.category, "III");
        assert_eq!(record.municipio, "SAN JUAN");
        assert_eq!(record.colegio, 3);
        assert_eq!(record.tomo, 21);
        assert_eq!(record.linea, 14);
    }

    #[test]
    fn sentinel_zero_is_not_found() {
        let outcome = parse_elector_response(&elector_xml(0)).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn sentinel_checked_before_numeric_conversion() {
        // A sentinel body with empty sibling fields must still decode as
        // not-found rather than fail on the empty numerics.
        let body = r#"<Elector><NumeroElectoral>0</NumeroElectoral><Precinto/></Elector>"#;
        let outcome = parse_elector_response(body).unwrap();
        assert!(outcome.is_none());
    }

    #[test]
    fn malformed_body_is_an_error() {
        let result = parse_elector_response("this is not XML at all <");
        assert!(matches!(result, Err(RecordError::Xml(_))));
    }

    #[test]
    fn non_numeric_field_is_an_error() {
        let body = r#"<Elector><NumeroElectoral>12</NumeroElectoral><Precinto>abc</Precinto></Elector>"#;
        let result = parse_elector_response(body);
        match result {
            Err(RecordError::NumericField { field, value }) => {
                assert_eq!(field, "Precinto");
                assert_eq!(value, "abc");
            }
            other => panic!("expected NumericField error, got {other:?}"),
        }
    }

    #[test]
    fn row_projection_covers_all_columns() {
        let record = parse_elector_response(&elector_xml(42))
            .unwrap()
            .expect("record expected");
        let row = record.to_row();
        for column in columns(true) {
            assert!(row.contains_key(&column), "row missing column {column}");
        }
        assert_eq!(row["NumeroElectoral"], "42");
        assert_eq!(row["Unidad"], "12");
        assert_eq!(row["EstatusDescripcion"], "ACTIVO");
    }

    #[test]
    fn columns_base_and_with_descriptions() {
        let base = columns(false);
        assert_eq!(
            base,
            [
                "NumeroElectoral",
                "Category",
                "FechaNacimiento",
                "Precinto",
                "Status",
                "Unidad"
            ]
        );

        let with_descriptions = columns(true);
        assert_eq!(with_descriptions.len(), 8);
        assert_eq!(&with_descriptions[..6], &base[..]);
        assert_eq!(with_descriptions[6], "EstatusDescripcion");
        assert_eq!(with_descriptions[7], "CategoriaDescripcion");
    }
}
