//! Application state shared across handlers.
//!
//! Every configured accessory gets a set of live characteristics, an
//! adapter built over them and a running [`Accessory`]. The HTTP layer
//! feeds sensor readings into the characteristics and talks to the
//! history fields through the accessory.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use evehist_core::{
    Accessory, AccessoryOptions, Characteristic, ConsumptionAdapter, ContactAdapter,
    MotionAdapter, PowerAdapter, SensorAdapter, WeatherAdapter,
};
use evehist_store::SnapshotStorage;
use evehist_types::SensorKind;

use crate::config::{AccessoryConfig, Config};

/// Live characteristics of one accessory, by sensor type.
#[derive(Debug, Clone)]
pub enum Characteristics {
    Contact {
        state: Characteristic<u8>,
        times_opened: Characteristic<u32>,
        last_activation: Characteristic<u32>,
    },
    Motion {
        detected: Characteristic<bool>,
        last_activation: Characteristic<u32>,
    },
    Energy {
        power: Characteristic<f64>,
        total: Characteristic<f64>,
    },
    Weather {
        temperature: Characteristic<f64>,
        humidity: Characteristic<f64>,
        pressure: Characteristic<f64>,
    },
}

impl Characteristics {
    /// Fresh characteristics for `kind`.
    pub fn for_kind(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Contact => Self::Contact {
                state: Characteristic::default(),
                times_opened: Characteristic::default(),
                last_activation: Characteristic::default(),
            },
            SensorKind::Motion => Self::Motion {
                detected: Characteristic::default(),
                last_activation: Characteristic::default(),
            },
            SensorKind::Consumption | SensorKind::Power => Self::Energy {
                power: Characteristic::default(),
                total: Characteristic::default(),
            },
            SensorKind::Weather => Self::Weather {
                temperature: Characteristic::default(),
                humidity: Characteristic::default(),
                pressure: Characteristic::default(),
            },
        }
    }

    /// Current values.
    pub fn values(&self) -> SensorValues {
        match self {
            Self::Contact {
                state,
                times_opened,
                last_activation,
            } => SensorValues {
                contact_state: Some(state.get()),
                times_opened: Some(times_opened.get()),
                last_activation: Some(last_activation.get()),
                ..Default::default()
            },
            Self::Motion {
                detected,
                last_activation,
            } => SensorValues {
                motion_detected: Some(detected.get()),
                last_activation: Some(last_activation.get()),
                ..Default::default()
            },
            Self::Energy { power, total } => SensorValues {
                power: Some(power.get()),
                total_consumption: Some(total.get()),
                ..Default::default()
            },
            Self::Weather {
                temperature,
                humidity,
                pressure,
            } => SensorValues {
                temperature: Some(temperature.get()),
                humidity: Some(humidity.get()),
                pressure: Some(pressure.get()),
                ..Default::default()
            },
        }
    }

    /// Write the values present in `values`.
    ///
    /// Fails without writing anything if a value does not belong to this
    /// sensor type; the error lists the offending fields.
    pub fn apply(&self, values: &SensorValues) -> Result<(), Vec<&'static str>> {
        let foreign = values.foreign_fields(self);
        if !foreign.is_empty() {
            return Err(foreign);
        }

        match self {
            Self::Contact {
                state,
                times_opened,
                last_activation,
            } => {
                set_opt(state, values.contact_state);
                set_opt(times_opened, values.times_opened);
                set_opt(last_activation, values.last_activation);
            }
            Self::Motion {
                detected,
                last_activation,
            } => {
                set_opt(detected, values.motion_detected);
                set_opt(last_activation, values.last_activation);
            }
            Self::Energy { power, total } => {
                set_opt(power, values.power);
                set_opt(total, values.total_consumption);
            }
            Self::Weather {
                temperature,
                humidity,
                pressure,
            } => {
                set_opt(temperature, values.temperature);
                set_opt(humidity, values.humidity);
                set_opt(pressure, values.pressure);
            }
        }
        Ok(())
    }

    /// Build the adapter for `config` over these characteristics.
    pub fn build_adapter(
        &self,
        config: &AccessoryConfig,
    ) -> evehist_core::Result<Box<dyn SensorAdapter>> {
        let adapter: Box<dyn SensorAdapter> = match (config.kind, self) {
            (
                SensorKind::Contact,
                Self::Contact {
                    state,
                    times_opened,
                    last_activation,
                },
            ) => Box::new(
                ContactAdapter::builder()
                    .state(state.clone())
                    .times_opened(times_opened.clone())
                    .last_activation(last_activation.clone())
                    .repeat_on_tick(config.repeat_on_tick)
                    .build()?,
            ),
            (
                SensorKind::Motion,
                Self::Motion {
                    detected,
                    last_activation,
                },
            ) => Box::new(
                MotionAdapter::builder()
                    .detected(detected.clone())
                    .last_activation(last_activation.clone())
                    .repeat_on_tick(config.repeat_on_tick)
                    .build()?,
            ),
            (SensorKind::Consumption, Self::Energy { power, total }) => Box::new(
                ConsumptionAdapter::builder()
                    .power(power.clone())
                    .total(total.clone())
                    .derive_power(config.derive_power)
                    .build()?,
            ),
            (SensorKind::Power, Self::Energy { power, total }) => Box::new(
                PowerAdapter::builder()
                    .power(power.clone())
                    .total(total.clone())
                    .build()?,
            ),
            (
                SensorKind::Weather,
                Self::Weather {
                    temperature,
                    humidity,
                    pressure,
                },
            ) => Box::new(
                WeatherAdapter::builder()
                    .temperature(temperature.clone())
                    .humidity(humidity.clone())
                    .pressure(pressure.clone())
                    .build()?,
            ),
            (kind, _) => {
                return Err(evehist_core::Error::Validation(format!(
                    "characteristics do not match a {} sensor",
                    kind
                )));
            }
        };
        Ok(adapter)
    }
}

fn set_opt<T>(characteristic: &Characteristic<T>, value: Option<T>)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    if let Some(value) = value {
        characteristic.set(value);
    }
}

/// Characteristic values as exchanged over the API.
///
/// Only the fields of the accessory's sensor type are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_state: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_opened: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_detected: Option<bool>,
    /// Watts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    /// Watt-hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_consumption: Option<f64>,
    /// Degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Hectopascal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl SensorValues {
    fn foreign_fields(&self, characteristics: &Characteristics) -> Vec<&'static str> {
        let present = [
            ("contact_state", self.contact_state.is_some()),
            ("times_opened", self.times_opened.is_some()),
            ("last_activation", self.last_activation.is_some()),
            ("motion_detected", self.motion_detected.is_some()),
            ("power", self.power.is_some()),
            ("total_consumption", self.total_consumption.is_some()),
            ("temperature", self.temperature.is_some()),
            ("humidity", self.humidity.is_some()),
            ("pressure", self.pressure.is_some()),
        ];
        let allowed: &[&str] = match characteristics {
            Characteristics::Contact { .. } => {
                &["contact_state", "times_opened", "last_activation"]
            }
            Characteristics::Motion { .. } => &["motion_detected", "last_activation"],
            Characteristics::Energy { .. } => &["power", "total_consumption"],
            Characteristics::Weather { .. } => &["temperature", "humidity", "pressure"],
        };
        present
            .into_iter()
            .filter(|(name, set)| *set && !allowed.contains(name))
            .map(|(name, _)| name)
            .collect()
    }
}

/// One running accessory with its configuration and characteristics.
#[derive(Debug)]
pub struct AccessoryHandle {
    pub config: AccessoryConfig,
    pub characteristics: Characteristics,
    pub accessory: Accessory,
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Configuration the service started with.
    pub config: Config,
    /// Running accessories by id.
    pub accessories: BTreeMap<String, AccessoryHandle>,
}

impl AppState {
    /// Build and start every configured accessory.
    pub async fn start(
        config: Config,
        storage: Arc<dyn SnapshotStorage>,
    ) -> evehist_core::Result<Arc<Self>> {
        let options = config.history.options();
        let mut accessories = BTreeMap::new();

        if config.accessories.is_empty() {
            info!("No accessories configured");
        }

        for accessory_config in &config.accessories {
            let handle =
                start_accessory(accessory_config, Arc::clone(&storage), options).await?;
            accessories.insert(accessory_config.id.clone(), handle);
        }

        Ok(Arc::new(Self {
            config,
            accessories,
        }))
    }

    /// Look up an accessory by id.
    pub fn accessory(&self, id: &str) -> Option<&AccessoryHandle> {
        self.accessories.get(id)
    }

    /// Stop every accessory, saving its history.
    pub async fn shutdown(&self) {
        for (id, handle) in &self.accessories {
            if let Err(e) = handle.accessory.shutdown().await {
                warn!("Failed to save history of {} on shutdown: {}", id, e);
            }
        }
        info!("All accessories stopped");
    }
}

async fn start_accessory(
    config: &AccessoryConfig,
    storage: Arc<dyn SnapshotStorage>,
    options: AccessoryOptions,
) -> evehist_core::Result<AccessoryHandle> {
    let characteristics = Characteristics::for_kind(config.kind);
    let adapter = characteristics.build_adapter(config)?;
    let accessory = Accessory::spawn(config.id.clone(), adapter, storage, options).await;
    Ok(AccessoryHandle {
        config: config.clone(),
        characteristics,
        accessory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use evehist_store::MemoryStore;

    #[test]
    fn test_values_follow_kind() {
        let weather = Characteristics::for_kind(SensorKind::Weather);
        let values = weather.values();
        assert_eq!(values.temperature, Some(0.0));
        assert_eq!(values.contact_state, None);

        let json = serde_json::to_value(&values).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_apply_writes_characteristics() {
        let contact = Characteristics::for_kind(SensorKind::Contact);
        contact
            .apply(&SensorValues {
                contact_state: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(contact.values().contact_state, Some(1));
        assert_eq!(contact.values().times_opened, Some(0));
    }

    #[test]
    fn test_apply_rejects_foreign_fields() {
        let motion = Characteristics::for_kind(SensorKind::Motion);
        let err = motion
            .apply(&SensorValues {
                motion_detected: Some(true),
                power: Some(5.0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, vec!["power"]);
        assert_eq!(motion.values().motion_detected, Some(false));
    }

    #[test]
    fn test_build_adapter_for_every_kind() {
        for kind in SensorKind::ALL {
            let config = AccessoryConfig::new("x", kind);
            let adapter = Characteristics::for_kind(kind)
                .build_adapter(&config)
                .unwrap();
            assert_eq!(adapter.kind(), kind);
        }
    }

    #[test]
    fn test_build_adapter_rejects_mismatch() {
        let config = AccessoryConfig::new("x", SensorKind::Contact);
        let err = Characteristics::for_kind(SensorKind::Weather)
            .build_adapter(&config)
            .unwrap_err();
        assert!(matches!(err, evehist_core::Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let storage = Arc::new(MemoryStore::new());
        let config = Config {
            accessories: vec![
                AccessoryConfig::new("door", SensorKind::Contact),
                AccessoryConfig::new("plug", SensorKind::Power),
            ],
            ..Default::default()
        };
        let state = AppState::start(config, storage.clone()).await.unwrap();
        assert_eq!(state.accessories.len(), 2);
        assert!(state.accessory("door").is_some());
        assert!(state.accessory("nope").is_none());

        state.shutdown().await;
        assert_eq!(storage.save_count(), 2);
    }
}
