//! Inventory file parser (§4.1): reads ORL, IDA and FF10 dialects behind one
//! `InventoryReader` trait, so the rest of the pipeline never sees the
//! per-dialect layout.

mod error;
pub use error::InventoryError;

mod fields;

use std::io::{BufRead, BufReader, Read};

use anyhow::Result;
use located_error::LocatedError;
use mockall::automock;

use aep_domain::period::{parse_emission_value, Unit};
use aep_domain::record::{Dialect, Geometry, PointGeometry, Record, StackParams};
use aep_domain::{fips, scc, ControlData, Period};

/// Pollutant list and file-level identity discovered from the `#`-prefixed
/// header lines (§4.1): country, year and the declared pollutant order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub country: Option<String>,
    pub year: Option<u16>,
    pub pollutants: Vec<String>,
}

/// The three IDA record shapes, disambiguated purely by line length (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdaKind {
    Point,
    Area,
    Mobile,
}

/// Choose the IDA record shape from the first data line's length and the
/// header's pollutant count. `pollutants >= 10` is rejected as ambiguous:
/// at that point more than one of the three formulas can coincide.
pub fn detect_ida_kind(first_line_len: usize, pollutants: usize) -> Result<IdaKind, InventoryError> {
    if pollutants >= 10 {
        return Err(InventoryError::AmbiguousPollutantCount(pollutants));
    }
    let point = 249 + 52 * pollutants;
    let area = 15 + 47 * pollutants;
    let mobile = 25 + 20 * pollutants;
    match first_line_len {
        len if len == point => Ok(IdaKind::Point),
        len if len == area => Ok(IdaKind::Area),
        len if len == mobile => Ok(IdaKind::Mobile),
        len => Err(InventoryError::UnrecognizedIdaLength { len, pollutants }),
    }
}

fn detect_dialect(header_lines: &[String]) -> Result<Dialect, InventoryError> {
    for line in header_lines {
        match line.trim().to_ascii_uppercase().as_str() {
            "#ORL" => return Ok(Dialect::Orl),
            "#IDA" => return Ok(Dialect::Ida),
            "#FF10" => return Ok(Dialect::Ff10),
            _ => {}
        }
    }
    Err(InventoryError::MissingDialect)
}

fn parse_header(header_lines: &[String]) -> Header {
    let mut header = Header::default();
    for line in header_lines {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("#COUNTRY") {
            header.country = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("#YEAR") {
            header.year = rest.trim().parse().ok();
        } else if let Some(rest) = line.strip_prefix("#POLID").or_else(|| line.strip_prefix("#DATA")) {
            header.pollutants = rest.split_whitespace().map(str::to_string).collect();
        }
    }
    header
}

/// Split a raw file into its `#`-prefixed header lines and remaining data
/// lines (blank lines dropped), preserving data-line order (§4.1).
fn split_header(reader: impl Read) -> Result<(Header, Dialect, Vec<String>), InventoryError> {
    let mut header_lines = Vec::new();
    let mut data_lines = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with('#') {
            header_lines.push(line);
        } else {
            data_lines.push(line.trim_end_matches('!').to_string());
        }
    }
    if header_lines.is_empty() {
        return Err(InventoryError::MissingHeader);
    }
    let dialect = detect_dialect(&header_lines)?;
    let header = parse_header(&header_lines);
    Ok((header, dialect, data_lines))
}

/// Any input dialect's parsed records plus the file's header, abstracted
/// behind a trait so the speciation/spatialization stages can be exercised
/// against a mock inventory (§4.2, §4.3) without real files on disk.
#[automock]
pub trait InventoryReader {
    fn header(&self) -> &Header;
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Reads an ORL, IDA or FF10 file to completion and buffers its records;
/// `next_record` then drains them one at a time.
pub struct FileInventoryReader {
    header: Header,
    dialect: Dialect,
    records: std::vec::IntoIter<Record>,
}

impl FileInventoryReader {
    /// `period` names which `Period` bucket this file's values belong to
    /// (`Period::Annual` for an annual file, `Period::Month(n)` for one
    /// already-`[month]`-substituted monthly file); the unit converter
    /// divides by twelve whenever that period is a month (§4.1).
    pub fn open(reader: impl Read, input_units: Unit, period: Period) -> Result<Self> {
        let (header, dialect, data_lines) = split_header(reader).loc("While reading inventory header")?;
        let monthly_frequency = matches!(period, Period::Month(_));
        let converter = input_units.converter(monthly_frequency);
        let records = match dialect {
            Dialect::Ida => parse_ida(&header, &data_lines, &converter, period).loc("While parsing IDA inventory")?,
            Dialect::Orl | Dialect::Ff10 => parse_delimited(&header, &data_lines, dialect, &converter, period).loc("While parsing delimited inventory")?,
        };
        Ok(Self { header, dialect, records: records.into_iter() })
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl InventoryReader for FileInventoryReader {
    fn header(&self) -> &Header {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.next())
    }
}

fn parse_emission(line_no: usize, raw: &str) -> Result<f64, InventoryError> {
    parse_emission_value(raw).map_err(|_| InventoryError::BadNumericField { line_no, field: raw.to_string() })
}

const FT_TO_M: f64 = 0.3048;
const FT3_TO_M3: f64 = 0.0283168;

/// ORL/IDA stack fields are punched in feet, Fahrenheit and ft^3/s;
/// `StackParams` is metric throughout the rest of the pipeline (§4.6).
fn stack_params_from_imperial(height_ft: f64, diameter_ft: f64, exit_temp_f: f64, exit_velocity_ft_s: f64, flow_ft3_s: f64) -> StackParams {
    StackParams {
        height_m: height_ft * FT_TO_M,
        diameter_m: diameter_ft * FT_TO_M,
        exit_temp_k: (exit_temp_f - 32.0) * 5.0 / 9.0 + 273.15,
        exit_velocity_m_s: exit_velocity_ft_s * FT_TO_M,
        flow_m3_s: flow_ft3_s * FT3_TO_M3,
    }
}

fn parse_ida(header: &Header, data_lines: &[String], converter: &impl Fn(f64) -> f64, period: Period) -> Result<Vec<Record>, InventoryError> {
    let Some(first) = data_lines.first() else {
        return Ok(Vec::new());
    };
    let pollutants = header.pollutants.len();
    let kind = detect_ida_kind(first.len(), pollutants)?;
    let (prefix_fields, chunk_fields) = match kind {
        IdaKind::Point => (fields::IDA_POINT_PREFIX, fields::IDA_POINT_CHUNK),
        IdaKind::Area => (fields::IDA_AREA_PREFIX, fields::IDA_AREA_CHUNK),
        IdaKind::Mobile => (fields::IDA_MOBILE_PREFIX, fields::IDA_MOBILE_CHUNK),
    };
    let prefix_width = fields::prefix_width(prefix_fields);
    let chunk_width = fields::prefix_width(chunk_fields);

    let mut out = Vec::with_capacity(data_lines.len());
    for (line_no, line) in data_lines.iter().enumerate() {
        let prefix = fields::split_fixed(line, line_no, prefix_fields)?;
        let field = |name: &str| -> &str { prefix_fields.iter().position(|f| f.name == name).map(|i| prefix[i]).unwrap_or("") };

        let raw_fips = field("fips");
        let raw_scc = field("scc");
        let fips_code = fips::normalize(raw_fips)?;
        let scc_code = scc::normalize(raw_scc)?;

        let geometry = match kind {
            IdaKind::Point => Geometry::Point(PointGeometry {
                lon: field("longitude").parse().unwrap_or(0.0),
                lat: field("latitude").parse().unwrap_or(0.0),
                projected: None,
                stack: stack_params_from_imperial(
                    field("stack_height").parse().unwrap_or(0.0),
                    field("stack_diam").parse().unwrap_or(0.0),
                    field("exit_temp").parse().unwrap_or(0.0),
                    field("exit_velocity").parse().unwrap_or(0.0),
                    field("stack_flow").parse().unwrap_or(0.0),
                ),
            }),
            IdaKind::Area | IdaKind::Mobile => Geometry::Area,
        };

        let mut record = Record::new(if field("country").is_empty() { "US" } else { field("country") }, fips_code, scc_code, geometry, Dialect::Ida);
        if kind == IdaKind::Point {
            record.facility_id = Some(field("plant_id").to_string()).filter(|s| !s.is_empty());
            record.unit_id = Some(field("point_id").to_string()).filter(|s| !s.is_empty());
            record.stack_id = Some(field("stack_id").to_string()).filter(|s| !s.is_empty());
            record.sic = Some(field("sic").to_string()).filter(|s| !s.is_empty());
            record.naics = Some(field("naics").to_string()).filter(|s| !s.is_empty());
        }

        let mut offset = prefix_width;
        let mut first_control: Option<ControlData> = None;
        for pollutant in &header.pollutants {
            if offset + chunk_width > line.len() {
                return Err(InventoryError::LineTooShort { line_no, line: line.clone() });
            }
            let chunk = fields::split_fixed(&line[offset..offset + chunk_width], line_no, chunk_fields)?;
            let chunk_field = |name: &str| -> &str { chunk_fields.iter().position(|f| f.name == name).map(|i| chunk[i]).unwrap_or("") };

            let ann_value = parse_emission(line_no, chunk_field("ann_value"))?;
            let value = converter(ann_value);
            record.set_emission(period, pollutant.clone(), aep_domain::EmissionValue::new(value, Unit::G));

            if first_control.is_none() && matches!(kind, IdaKind::Point | IdaKind::Area) {
                let ceff = chunk_field("ceff");
                let reff = chunk_field("reff");
                let rpen = chunk_field("rpen");
                first_control = Some(ControlData::from_fields(None, Some(ceff), Some(reff), Some(rpen)));
            }
            offset += chunk_width;
        }
        if let Some(control) = first_control {
            record.control = control;
        }
        out.push(record);
    }
    Ok(out)
}

fn parse_delimited(header: &Header, data_lines: &[String], dialect: Dialect, converter: &impl Fn(f64) -> f64, period: Period) -> Result<Vec<Record>, InventoryError> {
    let is_point = |fields: &[&str]| fields.len() >= 15;
    let mut out = Vec::with_capacity(data_lines.len());

    for (line_no, line) in data_lines.iter().enumerate() {
        let all: Vec<&str> = line.split(',').map(str::trim).collect();
        let point = is_point(&all);
        let prefix_len = if point { 15 } else { 2 };
        if all.len() < prefix_len {
            return Err(InventoryError::LineTooShort { line_no, line: line.clone() });
        }
        let (prefix, rest) = all.split_at(prefix_len);

        let (country, raw_fips, raw_scc, geometry, facility_id, unit_id, stack_id, sic, naics) = if point {
            (
                prefix[0],
                prefix[1],
                prefix[5],
                Geometry::Point(PointGeometry {
                    lon: prefix[6].parse().unwrap_or(0.0),
                    lat: prefix[7].parse().unwrap_or(0.0),
                    projected: None,
                    stack: stack_params_from_imperial(
                        prefix[8].parse().unwrap_or(0.0),
                        prefix[9].parse().unwrap_or(0.0),
                        prefix[10].parse().unwrap_or(0.0),
                        prefix[11].parse().unwrap_or(0.0),
                        prefix[12].parse().unwrap_or(0.0),
                    ),
                }),
                Some(prefix[2]).filter(|s| !s.is_empty()),
                Some(prefix[3]).filter(|s| !s.is_empty()),
                Some(prefix[4]).filter(|s| !s.is_empty()),
                Some(prefix[13]).filter(|s| !s.is_empty()),
                Some(prefix[14]).filter(|s| !s.is_empty()),
            )
        } else {
            ("US", prefix[0], prefix[1], Geometry::Area, None, None, None, None, None)
        };

        let fips_code = fips::normalize(raw_fips)?;
        let scc_code = scc::normalize(raw_scc)?;
        let mut record = Record::new(country, fips_code, scc_code, geometry, dialect);
        record.facility_id = facility_id.map(str::to_string);
        record.unit_id = unit_id.map(str::to_string);
        record.stack_id = stack_id.map(str::to_string);
        record.sic = sic.map(str::to_string);
        record.naics = naics.map(str::to_string);

        if rest.len() < header.pollutants.len() * 2 {
            return Err(InventoryError::LineTooShort { line_no, line: line.clone() });
        }
        for (i, pollutant) in header.pollutants.iter().enumerate() {
            let raw_value = rest[i * 2 + 1];
            let ann_value = parse_emission(line_no, raw_value)?;
            let value = converter(ann_value);
            record.set_emission(period, pollutant.clone(), aep_domain::EmissionValue::new(value, Unit::G));
        }
        out.push(record);
    }
    Ok(out)
}
