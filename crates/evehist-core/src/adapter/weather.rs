//! Temperature, humidity and pressure sensors.

use std::sync::Arc;

use tracing::debug;

use evehist_types::{Entry, Sample, SensorKind};

use super::{SensorAdapter, default_clock, require};
use crate::characteristic::Characteristic;
use crate::clock::Clock;
use crate::error::Result;
use crate::service::HistoryService;

/// Appends the average of the readings sampled since the previous tick.
#[derive(Debug)]
pub struct WeatherAdapter {
    history: HistoryService,
    temperature: Characteristic<f64>,
    humidity: Characteristic<f64>,
    pressure: Characteristic<f64>,
    samples: Vec<[f64; 3]>,
    clock: Arc<dyn Clock>,
}

/// Builder for [`WeatherAdapter`].
#[derive(Debug, Default)]
pub struct WeatherAdapterBuilder {
    temperature: Option<Characteristic<f64>>,
    humidity: Option<Characteristic<f64>>,
    pressure: Option<Characteristic<f64>>,
    clock: Option<Arc<dyn Clock>>,
}

impl WeatherAdapterBuilder {
    /// Temperature in °C. Required.
    #[must_use]
    pub fn temperature(mut self, temperature: Characteristic<f64>) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Relative humidity in %. Required.
    #[must_use]
    pub fn humidity(mut self, humidity: Characteristic<f64>) -> Self {
        self.humidity = Some(humidity);
        self
    }

    /// Air pressure in hPa. Required.
    #[must_use]
    pub fn pressure(mut self, pressure: Characteristic<f64>) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Time source. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<WeatherAdapter> {
        Ok(WeatherAdapter {
            history: HistoryService::new(SensorKind::Weather),
            temperature: require(self.temperature, "temperature")?,
            humidity: require(self.humidity, "humidity")?,
            pressure: require(self.pressure, "air pressure")?,
            samples: Vec::new(),
            clock: self.clock.unwrap_or_else(default_clock),
        })
    }
}

impl WeatherAdapter {
    /// Create a builder.
    pub fn builder() -> WeatherAdapterBuilder {
        WeatherAdapterBuilder::default()
    }

    fn current(&self) -> [f64; 3] {
        [
            self.temperature.get(),
            self.humidity.get(),
            self.pressure.get(),
        ]
    }

    fn average(&self) -> [f64; 3] {
        if self.samples.is_empty() {
            return self.current();
        }
        let count = self.samples.len() as f64;
        let mut sum = [0.0; 3];
        for sample in &self.samples {
            for (acc, value) in sum.iter_mut().zip(sample) {
                *acc += value;
            }
        }
        sum.map(|total| total / count)
    }
}

impl SensorAdapter for WeatherAdapter {
    fn history(&self) -> &HistoryService {
        &self.history
    }

    fn history_mut(&mut self) -> &mut HistoryService {
        &mut self.history
    }

    fn on_sample(&mut self) {
        let current = self.current();
        self.samples.push(current);
    }

    fn on_tick(&mut self) {
        let [temp, humidity, pressure] = self.average();
        debug!(
            "Weather tick over {} samples: {:.2} °C, {:.2} %, {:.1} hPa",
            self.samples.len(),
            temp,
            humidity,
            pressure
        );
        self.samples.clear();
        self.history.add_entry(Entry::sample(
            self.clock.now(),
            Sample::Weather {
                temp,
                humidity,
                pressure,
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::encoding::{EntryCodec, WeatherCodec};

    const T0: u32 = 1_700_000_000;

    struct Fixture {
        adapter: WeatherAdapter,
        temperature: Characteristic<f64>,
        humidity: Characteristic<f64>,
    }

    fn fixture() -> Fixture {
        let temperature = Characteristic::new(21.34);
        let humidity = Characteristic::new(40.0);
        let pressure = Characteristic::new(1013.0);
        let adapter = WeatherAdapter::builder()
            .temperature(temperature.clone())
            .humidity(humidity.clone())
            .pressure(pressure)
            .clock(Arc::new(ManualClock::new(T0)))
            .build()
            .unwrap();
        Fixture {
            adapter,
            temperature,
            humidity,
        }
    }

    fn newest(adapter: &WeatherAdapter) -> Sample {
        let store = adapter.history().store();
        *store
            .entry_at(store.last_index())
            .unwrap()
            .as_sample()
            .unwrap()
    }

    #[test]
    fn test_tick_without_samples_uses_held_values() {
        let mut f = fixture();
        f.adapter.on_tick();

        let sample = newest(&f.adapter);
        assert_eq!(
            sample,
            Sample::Weather {
                temp: 21.34,
                humidity: 40.0,
                pressure: 1013.0
            }
        );
        let record = WeatherCodec.encode_entry(2, 0, &sample);
        assert_eq!(&record[10..12], &2134i16.to_le_bytes());
    }

    #[test]
    fn test_tick_averages_samples() {
        let mut f = fixture();
        f.temperature.set(20.0);
        f.humidity.set(50.0);
        f.adapter.on_sample();
        f.temperature.set(22.0);
        f.humidity.set(60.0);
        f.adapter.on_sample();
        f.adapter.on_tick();

        let Sample::Weather { temp, humidity, .. } = newest(&f.adapter) else {
            panic!("expected weather sample");
        };
        assert!((temp - 21.0).abs() < 1e-9);
        assert!((humidity - 55.0).abs() < 1e-9);

        // samples are cleared after each tick
        f.adapter.on_tick();
        let Sample::Weather { temp, .. } = newest(&f.adapter) else {
            panic!("expected weather sample");
        };
        assert_eq!(temp, 22.0);
    }

    #[test]
    fn test_build_requires_pressure() {
        let err = WeatherAdapter::builder()
            .temperature(Characteristic::new(0.0))
            .humidity(Characteristic::new(0.0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("air pressure"));
    }
}
