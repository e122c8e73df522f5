//! Text wire protocol spoken with the mobility simulator.
//!
//! One request per datagram, `VERB:field,field,...`:
//!
//! | Request                                   | Response                  |
//! |-------------------------------------------|---------------------------|
//! | `LOC_UPDATE:id,x,y,z,heading,vx,vy,vz`    | `LOC_CONFIRM:veh<id>`     |
//! | `CALC_REQUEST_PATHGAIN:a,b`               | `CALC_DONE_PATHGAIN:<dB>` |
//! | `CALC_REQUEST_DELAY:a,b`                  | `CALC_DONE_DELAY:<s>`     |
//! | `CALC_REQUEST_LOS:a,b`                    | `CALC_DONE_LOS:<list>`    |
//! | `SHUTDOWN_SIONNA`                         | none                      |
//!
//! Entity ids may carry a `veh` prefix. In queries an empty id or `0` names
//! the calibration sentinel.

use crate::bridge::{EntityId, LosReport, Pose};
use crate::engine::Vec3;

pub const LOC_UPDATE: &str = "LOC_UPDATE:";
pub const PATH_GAIN_REQUEST: &str = "CALC_REQUEST_PATHGAIN:";
pub const DELAY_REQUEST: &str = "CALC_REQUEST_DELAY:";
pub const LOS_REQUEST: &str = "CALC_REQUEST_LOS:";
pub const SHUTDOWN: &str = "SHUTDOWN_SIONNA";

const LOC_UPDATE_FIELDS: usize = 8;
const ID_PREFIX: &str = "veh";

/// A parsed inbound datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    LocationUpdate { id: EntityId, pose: Pose },
    PathGain { source: EntityId, target: EntityId },
    Delay { source: EntityId, target: EntityId },
    LineOfSight { source: EntityId, target: EntityId },
    Shutdown,
}

/// Reasons a datagram could not be turned into a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// No known verb prefixes the message.
    UnknownVerb(String),
    /// The verb was recognized but its fields were not.
    Malformed { verb: &'static str, reason: String },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::UnknownVerb(message) => write!(f, "Unknown message: {}", message),
            ProtocolError::Malformed { verb, reason } => write!(f, "Malformed {} request: {}", verb.trim_end_matches(':'), reason),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl Request {
    /// Parse one datagram payload.
    ///
    /// Verbs are matched by prefix. No verb is a prefix of another, so at
    /// most one can apply.
    pub fn parse(message: &str) -> Result<Request, ProtocolError> {
        let message = message.trim_end_matches(['\0', '\r', '\n']);

        if let Some(data) = message.strip_prefix(LOC_UPDATE) {
            parse_location_update(data)
        } else if let Some(data) = message.strip_prefix(PATH_GAIN_REQUEST) {
            let (source, target) = parse_pair(PATH_GAIN_REQUEST, data)?;
            Ok(Request::PathGain { source, target })
        } else if let Some(data) = message.strip_prefix(DELAY_REQUEST) {
            let (source, target) = parse_pair(DELAY_REQUEST, data)?;
            Ok(Request::Delay { source, target })
        } else if let Some(data) = message.strip_prefix(LOS_REQUEST) {
            let (source, target) = parse_pair(LOS_REQUEST, data)?;
            Ok(Request::LineOfSight { source, target })
        } else if message.starts_with(SHUTDOWN) {
            Ok(Request::Shutdown)
        } else {
            Err(ProtocolError::UnknownVerb(message.to_string()))
        }
    }
}

fn malformed(verb: &'static str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed { verb, reason: reason.into() }
}

/// Location updates always name a real entity; the id must be numeric.
fn parse_location_update(data: &str) -> Result<Request, ProtocolError> {
    let parts: Vec<&str> = data.split(',').map(str::trim).collect();
    if parts.len() < LOC_UPDATE_FIELDS {
        return Err(malformed(LOC_UPDATE, format!("expected {} fields, got {}", LOC_UPDATE_FIELDS, parts.len())));
    }

    let id = parts[0].replace(ID_PREFIX, "");
    let id = id.parse::<u32>().map_err(|e| malformed(LOC_UPDATE, format!("bad entity id {:?}: {}", parts[0], e)))?;

    let mut values = [0.0; LOC_UPDATE_FIELDS - 1];
    for (slot, field) in values.iter_mut().zip(&parts[1..LOC_UPDATE_FIELDS]) {
        let value = field.parse::<f64>().map_err(|e| malformed(LOC_UPDATE, format!("bad number {:?}: {}", field, e)))?;
        if !value.is_finite() {
            return Err(malformed(LOC_UPDATE, format!("non-finite number {:?}", field)));
        }
        *slot = value;
    }
    let [x, y, z, heading, vx, vy, vz] = values;

    Ok(Request::LocationUpdate {
        id: EntityId(id),
        pose: Pose {
            position: Vec3::new(x, y, z),
            heading,
            velocity: Some(Vec3::new(vx, vy, vz)),
        },
    })
}

fn parse_pair(verb: &'static str, data: &str) -> Result<(EntityId, EntityId), ProtocolError> {
    let mut parts = data.split(',');
    let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
        return Err(malformed(verb, "expected two entity ids"));
    };
    Ok((parse_query_id(verb, a)?, parse_query_id(verb, b)?))
}

fn parse_query_id(verb: &'static str, field: &str) -> Result<EntityId, ProtocolError> {
    let id = field.replace(ID_PREFIX, "");
    let id = id.trim();
    if id.is_empty() || id == "0" {
        return Ok(EntityId::SENTINEL);
    }
    id.parse::<u32>().map(EntityId).map_err(|e| malformed(verb, format!("bad entity id {:?}: {}", field, e)))
}

pub fn location_confirm(id: EntityId) -> String {
    format!("LOC_CONFIRM:{}{}", ID_PREFIX, id)
}

pub fn path_gain_done(loss_db: f64) -> String {
    format!("CALC_DONE_PATHGAIN:{}", format_scalar(loss_db))
}

pub fn delay_done(delay: f64) -> String {
    format!("CALC_DONE_DELAY:{}", format_scalar(delay))
}

pub fn los_done(report: &LosReport) -> String {
    match report {
        LosReport::Neutral => "CALC_DONE_LOS:0".to_string(),
        LosReport::Paths(flags) => {
            let items: Vec<&str> = flags.iter().map(|&los| if los { "True" } else { "False" }).collect();
            format!("CALC_DONE_LOS:[{}]", items.join(", "))
        }
    }
}

/// Shortest round-trip decimal; whole numbers drop the fraction.
fn format_scalar(value: f64) -> String {
    format!("{}", value)
}
