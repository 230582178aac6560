//! Per-sensor entry record encodings.
//!
//! Every record starts with a one-byte length followed by the entry's
//! logical index and its time delta, then a type tag and the sensor
//! fields. All integers are little-endian.
//!
//! | Sensor | Tag | Fields |
//! |--------|-----|--------|
//! | Contact | `01` | status `u8` |
//! | Motion | `02` | status `u8` |
//! | Consumption / Power | `1f` | `00×4`, power ×10 `u16`, `00×4` |
//! | Weather | `07` | temp ×100 `i16`, humidity ×100 `u16`, pressure ×10 `u16` |
//!
//! Reference-time markers use a separate fixed record, see [`ref_time_record`].

use bytes::{BufMut, BytesMut};

use evehist_types::{Sample, SensorKind};

/// Length of a reference-time record.
pub const REF_TIME_RECORD_LEN: u8 = 0x15;

const REF_TIME_TAG: u8 = 0x81;

/// Binary layout of one sensor type's history records.
pub trait EntryCodec: Send + Sync {
    /// Sensor type this codec encodes.
    fn kind(&self) -> SensorKind;

    /// Field layout descriptor announced in the status payload.
    fn fingerprint(&self) -> &'static [u8] {
        self.kind().fingerprint()
    }

    /// Encode `sample` stored at logical `index`, `delta` seconds after the
    /// reference time.
    ///
    /// Samples of a different shape encode as zero values.
    fn encode_entry(&self, index: u32, delta: u32, sample: &Sample) -> Vec<u8>;
}

/// Contact sensor records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactCodec;

/// Motion sensor records.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionCodec;

/// Energy records shared by the consumption and power sensors.
#[derive(Debug, Clone, Copy)]
pub struct EnergyCodec(SensorKind);

/// Weather station records.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherCodec;

/// The codec for `kind`.
pub fn codec_for(kind: SensorKind) -> &'static dyn EntryCodec {
    static CONSUMPTION: EnergyCodec = EnergyCodec(SensorKind::Consumption);
    static POWER: EnergyCodec = EnergyCodec(SensorKind::Power);

    match kind {
        SensorKind::Contact => &ContactCodec,
        SensorKind::Motion => &MotionCodec,
        SensorKind::Consumption => &CONSUMPTION,
        SensorKind::Power => &POWER,
        SensorKind::Weather => &WeatherCodec,
    }
}

/// Record telling the reader to (re)learn the reference time.
pub fn ref_time_record(index: u32, ref_time: u32) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(REF_TIME_RECORD_LEN as usize);
    buf.put_u8(REF_TIME_RECORD_LEN);
    buf.put_u32_le(index);
    buf.put_u32_le(1);
    buf.put_u8(REF_TIME_TAG);
    buf.put_u32_le(ref_time);
    buf.put_bytes(0, 7);
    buf.to_vec()
}

fn header(len: u8, index: u32, delta: u32, tag: u8) -> BytesMut {
    let mut buf = BytesMut::with_capacity(len as usize);
    buf.put_u8(len);
    buf.put_u32_le(index);
    buf.put_u32_le(delta);
    buf.put_u8(tag);
    buf
}

fn status_record(kind: SensorKind, index: u32, delta: u32, sample: &Sample) -> Vec<u8> {
    let mut buf = header(0x0b, index, delta, kind.entry_tag());
    buf.put_u8(sample.status().unwrap_or(0));
    buf.to_vec()
}

/// Scale `value` by `factor` and round to the nearest integer.
fn scaled(value: f64, factor: f64) -> f64 {
    (value * factor).round()
}

impl EntryCodec for ContactCodec {
    fn kind(&self) -> SensorKind {
        SensorKind::Contact
    }

    fn encode_entry(&self, index: u32, delta: u32, sample: &Sample) -> Vec<u8> {
        status_record(SensorKind::Contact, index, delta, sample)
    }
}

impl EntryCodec for MotionCodec {
    fn kind(&self) -> SensorKind {
        SensorKind::Motion
    }

    fn encode_entry(&self, index: u32, delta: u32, sample: &Sample) -> Vec<u8> {
        status_record(SensorKind::Motion, index, delta, sample)
    }
}

impl EnergyCodec {
    /// Codec for `kind`, which must be one of the energy sensors.
    pub fn new(kind: SensorKind) -> Option<Self> {
        matches!(kind, SensorKind::Consumption | SensorKind::Power).then_some(Self(kind))
    }
}

impl EntryCodec for EnergyCodec {
    fn kind(&self) -> SensorKind {
        self.0
    }

    fn encode_entry(&self, index: u32, delta: u32, sample: &Sample) -> Vec<u8> {
        let power = sample.power().unwrap_or(0.0);
        let mut buf = header(0x14, index, delta, self.0.entry_tag());
        buf.put_bytes(0, 4);
        buf.put_u16_le(scaled(power, 10.0) as u16);
        buf.put_bytes(0, 4);
        buf.to_vec()
    }
}

impl EntryCodec for WeatherCodec {
    fn kind(&self) -> SensorKind {
        SensorKind::Weather
    }

    fn encode_entry(&self, index: u32, delta: u32, sample: &Sample) -> Vec<u8> {
        let (temp, humidity, pressure) = match *sample {
            Sample::Weather {
                temp,
                humidity,
                pressure,
            } => (temp, humidity, pressure),
            _ => (0.0, 0.0, 0.0),
        };
        let mut buf = header(0x10, index, delta, SensorKind::Weather.entry_tag());
        buf.put_i16_le(scaled(temp, 100.0) as i16);
        buf.put_u16_le(scaled(humidity, 100.0) as u16);
        buf.put_u16_le(scaled(pressure, 10.0) as u16);
        buf.to_vec()
    }
}
