use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::schema::Granularity;

/// Canonical meteorological variables known to the station stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeteoVariable {
    // daily
    DailyAirTemperatureMin,
    DailyAirTemperatureMax,
    DailyAirTemperatureAvg,
    DailyPrecipitation,
    DailyAirRelHumidityMin,
    DailyAirRelHumidityMax,
    DailyAirRelHumidityAvg,
    DailyGlobalRadiation,
    DailyWindScalarIntensityAvg,
    DailyWindScalarIntensityMax,
    DailyWindVectorIntensityAvg,
    DailyWindVectorIntensityMax,
    DailyWindVectorDirectionPrevailing,
    DailyReferenceEvapotranspirationHS,
    DailyReferenceEvapotranspirationPM,
    DailyLeafWetness,
    DailyWaterTableDepth,
    // hourly
    AirTemperature,
    Precipitation,
    AirRelHumidity,
    GlobalIrradiance,
    WindScalarIntensity,
    WindVectorIntensity,
    WindVectorDirection,
    LeafWetness,
    ReferenceEvapotranspiration,
    AirDewTemperature,
    AtmPressure,
}

const DAILY_VARIABLES: &[(&str, MeteoVariable)] = &[
    ("DAILY_TMIN", MeteoVariable::DailyAirTemperatureMin),
    ("DAILY_TMAX", MeteoVariable::DailyAirTemperatureMax),
    ("DAILY_TAVG", MeteoVariable::DailyAirTemperatureAvg),
    ("DAILY_PREC", MeteoVariable::DailyPrecipitation),
    ("DAILY_RHMIN", MeteoVariable::DailyAirRelHumidityMin),
    ("DAILY_RHMAX", MeteoVariable::DailyAirRelHumidityMax),
    ("DAILY_RHAVG", MeteoVariable::DailyAirRelHumidityAvg),
    ("DAILY_RAD", MeteoVariable::DailyGlobalRadiation),
    ("DAILY_W_SCAL_INT_AVG", MeteoVariable::DailyWindScalarIntensityAvg),
    ("DAILY_W_SCAL_INT_MAX", MeteoVariable::DailyWindScalarIntensityMax),
    ("DAILY_W_VEC_INT_AVG", MeteoVariable::DailyWindVectorIntensityAvg),
    ("DAILY_W_VEC_INT_MAX", MeteoVariable::DailyWindVectorIntensityMax),
    ("DAILY_W_VEC_DIR_PREV", MeteoVariable::DailyWindVectorDirectionPrevailing),
    ("DAILY_ET0_HS", MeteoVariable::DailyReferenceEvapotranspirationHS),
    ("DAILY_ET0_PM", MeteoVariable::DailyReferenceEvapotranspirationPM),
    ("DAILY_LEAFW", MeteoVariable::DailyLeafWetness),
    ("DAILY_WATER_TABLE_DEPTH", MeteoVariable::DailyWaterTableDepth),
];

const HOURLY_VARIABLES: &[(&str, MeteoVariable)] = &[
    ("TAVG", MeteoVariable::AirTemperature),
    ("PREC", MeteoVariable::Precipitation),
    ("RHAVG", MeteoVariable::AirRelHumidity),
    ("RAD", MeteoVariable::GlobalIrradiance),
    ("W_SCAL_INT", MeteoVariable::WindScalarIntensity),
    ("W_VEC_INT", MeteoVariable::WindVectorIntensity),
    ("W_VEC_DIR", MeteoVariable::WindVectorDirection),
    ("LEAFW", MeteoVariable::LeafWetness),
    ("ET0", MeteoVariable::ReferenceEvapotranspiration),
    ("TDAVG", MeteoVariable::AirDewTemperature),
    ("PRESSURE", MeteoVariable::AtmPressure),
];

impl MeteoVariable {
    /// Resolve a schema variable name for the given granularity.
    ///
    /// Names are matched case-insensitively; a daily name never resolves
    /// in an hourly file and vice versa.
    pub fn from_name(name: &str, granularity: Granularity) -> Option<Self> {
        let table = match granularity {
            Granularity::Daily => DAILY_VARIABLES,
            Granularity::Hourly => HOURLY_VARIABLES,
        };
        let name = name.trim();
        table
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, var)| *var)
    }

    pub fn name(&self) -> &'static str {
        DAILY_VARIABLES
            .iter()
            .chain(HOURLY_VARIABLES.iter())
            .find(|(_, var)| var == self)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    pub fn granularity(&self) -> Granularity {
        if DAILY_VARIABLES.iter().any(|(_, var)| var == self) {
            Granularity::Daily
        } else {
            Granularity::Hourly
        }
    }

    /// Identifier used by the bundled sinks: hourly variables count from 1,
    /// daily ones from 101, in table order.
    pub fn default_id(&self) -> i32 {
        let (table, base) = match self.granularity() {
            Granularity::Daily => (DAILY_VARIABLES, 101),
            Granularity::Hourly => (HOURLY_VARIABLES, 1),
        };
        table
            .iter()
            .position(|(_, var)| var == self)
            .map(|index| base + index as i32)
            .unwrap_or(0)
    }
}

impl fmt::Display for MeteoVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
