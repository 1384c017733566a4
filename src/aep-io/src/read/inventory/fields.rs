//! Per-dialect field tables (§4.1, §9 redesign: states each field's offset
//! and width directly rather than driving the parser off reflective tags).

use super::error::InventoryError;

#[derive(Debug, Clone, Copy)]
pub struct FixedField {
    pub name: &'static str,
    pub width: usize,
}

const fn f(name: &'static str, width: usize) -> FixedField {
    FixedField { name, width }
}

/// Non-pollutant prefix for an IDA point record: 249 bytes.
pub const IDA_POINT_PREFIX: &[FixedField] = &[
    f("country", 2),
    f("fips", 5),
    f("plant_id", 15),
    f("point_id", 15),
    f("stack_id", 15),
    f("scc", 10),
    f("longitude", 10),
    f("latitude", 10),
    f("stack_height", 8),
    f("stack_diam", 8),
    f("exit_temp", 8),
    f("exit_velocity", 8),
    f("stack_flow", 10),
    f("sic", 4),
    f("naics", 6),
    f("facility_name", 40),
    f("unused", 75),
];

/// Per-pollutant chunk for an IDA point record: 52 bytes.
pub const IDA_POINT_CHUNK: &[FixedField] =
    &[f("poll_code", 5), f("ann_value", 15), f("avd_value", 15), f("ceff", 5), f("reff", 5), f("rpen", 5), f("unused", 2)];

/// Non-pollutant prefix for an IDA area record: 15 bytes.
pub const IDA_AREA_PREFIX: &[FixedField] = &[f("fips", 5), f("scc", 10)];

/// Per-pollutant chunk for an IDA area record: 47 bytes.
pub const IDA_AREA_CHUNK: &[FixedField] =
    &[f("poll_code", 5), f("ann_value", 15), f("avd_value", 10), f("ceff", 5), f("reff", 5), f("rpen", 5), f("unused", 2)];

/// Non-pollutant prefix for an IDA mobile record: 25 bytes.
pub const IDA_MOBILE_PREFIX: &[FixedField] = &[f("fips", 5), f("scc", 10), f("link_id", 10)];

/// Per-pollutant chunk for an IDA mobile record: 20 bytes.
pub const IDA_MOBILE_CHUNK: &[FixedField] = &[f("poll_code", 5), f("ann_value", 10), f("ceff", 5)];

pub fn prefix_width(fields: &[FixedField]) -> usize {
    fields.iter().map(|field| field.width).sum()
}

/// Split `line` into trimmed slices per `fields`, in order, failing if the
/// line is too short to hold them.
pub fn split_fixed<'a>(line: &'a str, line_no: usize, fields: &[FixedField]) -> Result<Vec<&'a str>, InventoryError> {
    let bytes = line.as_bytes();
    let mut out = Vec::with_capacity(fields.len());
    let mut offset = 0;
    for field in fields {
        let end = offset + field.width;
        if end > bytes.len() {
            return Err(InventoryError::LineTooShort { line_no, line: line.to_string() });
        }
        out.push(line[offset..end].trim());
        offset = end;
    }
    Ok(out)
}
