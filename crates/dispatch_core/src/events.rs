//! Observability events emitted by the dispatch core.
//!
//! Events are typed variants; the flat key-value attribute form used by external
//! analytics is produced and parsed only at the boundary ([DispatchEvent::to_attributes],
//! [DispatchEvent::from_attributes]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EventParseError;
use crate::model::{PassengerId, RequestId, SimTime, VehicleId};

pub const CONFIRMATION_CREATED: &str = "driverConfirmationCreated";
pub const CONFIRMATION_COMPLETED: &str = "driverConfirmationCompleted";

const ATTR_TIME: &str = "time";
const ATTR_TYPE: &str = "type";
const ATTR_REQUEST: &str = "request";
const ATTR_PERSON: &str = "person";
const ATTR_VEHICLE: &str = "vehicle";
const ATTR_ACCEPTED: &str = "accepted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    #[serde(rename = "driverConfirmationCreated")]
    ConfirmationCreated {
        time: SimTime,
        request: RequestId,
        passenger: PassengerId,
        vehicle: VehicleId,
    },
    #[serde(rename = "driverConfirmationCompleted")]
    ConfirmationCompleted {
        time: SimTime,
        request: RequestId,
        passenger: PassengerId,
        vehicle: VehicleId,
        accepted: bool,
    },
}

impl DispatchEvent {
    pub fn time(&self) -> SimTime {
        match self {
            DispatchEvent::ConfirmationCreated { time, .. }
            | DispatchEvent::ConfirmationCompleted { time, .. } => *time,
        }
    }

    pub fn request(&self) -> RequestId {
        match self {
            DispatchEvent::ConfirmationCreated { request, .. }
            | DispatchEvent::ConfirmationCompleted { request, .. } => *request,
        }
    }

    pub fn vehicle(&self) -> VehicleId {
        match self {
            DispatchEvent::ConfirmationCreated { vehicle, .. }
            | DispatchEvent::ConfirmationCompleted { vehicle, .. } => *vehicle,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::ConfirmationCreated { .. } => CONFIRMATION_CREATED,
            DispatchEvent::ConfirmationCompleted { .. } => CONFIRMATION_COMPLETED,
        }
    }

    /// Flat attribute form. Ids are written as their numeric value, time in
    /// milliseconds.
    pub fn to_attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        attrs.insert(ATTR_TIME.to_string(), self.time().to_string());
        attrs.insert(ATTR_TYPE.to_string(), self.event_type().to_string());
        let (request, passenger, vehicle) = match self {
            DispatchEvent::ConfirmationCreated {
                request,
                passenger,
                vehicle,
                ..
            }
            | DispatchEvent::ConfirmationCompleted {
                request,
                passenger,
                vehicle,
                ..
            } => (request, passenger, vehicle),
        };
        attrs.insert(ATTR_REQUEST.to_string(), request.0.to_string());
        attrs.insert(ATTR_PERSON.to_string(), passenger.0.to_string());
        attrs.insert(ATTR_VEHICLE.to_string(), vehicle.0.to_string());
        if let DispatchEvent::ConfirmationCompleted { accepted, .. } = self {
            attrs.insert(ATTR_ACCEPTED.to_string(), accepted.to_string());
        }
        attrs
    }

    pub fn from_attributes(attrs: &BTreeMap<String, String>) -> Result<Self, EventParseError> {
        let time = parse_attr::<SimTime>(attrs, ATTR_TIME)?;
        let request = RequestId(parse_attr(attrs, ATTR_REQUEST)?);
        let passenger = PassengerId(parse_attr(attrs, ATTR_PERSON)?);
        let vehicle = VehicleId(parse_attr(attrs, ATTR_VEHICLE)?);
        let event_type = attrs
            .get(ATTR_TYPE)
            .ok_or(EventParseError::MissingAttribute(ATTR_TYPE))?;
        match event_type.as_str() {
            CONFIRMATION_CREATED => Ok(DispatchEvent::ConfirmationCreated {
                time,
                request,
                passenger,
                vehicle,
            }),
            CONFIRMATION_COMPLETED => Ok(DispatchEvent::ConfirmationCompleted {
                time,
                request,
                passenger,
                vehicle,
                accepted: parse_attr(attrs, ATTR_ACCEPTED)?,
            }),
            other => Err(EventParseError::UnknownType(other.to_string())),
        }
    }
}

fn parse_attr<T: std::str::FromStr>(
    attrs: &BTreeMap<String, String>,
    key: &'static str,
) -> Result<T, EventParseError> {
    let raw = attrs
        .get(key)
        .ok_or(EventParseError::MissingAttribute(key))?;
    raw.parse().map_err(|_| EventParseError::InvalidAttribute {
        key,
        value: raw.clone(),
    })
}

/// Destination for dispatch events. Events arrive in emission order.
pub trait EventSink {
    fn emit(&mut self, event: DispatchEvent);
}

impl EventSink for Vec<DispatchEvent> {
    fn emit(&mut self, event: DispatchEvent) {
        self.push(event);
    }
}
