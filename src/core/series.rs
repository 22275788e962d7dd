//! Time-ordered sensor series.
//!
//! A [`SensorSeries`] is one channel of observations; a [`TabularSeries`] is
//! several named channels sharing one index. Both enforce a strictly
//! increasing index at construction.

use crate::core::matrix::FeatureMatrix;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// A single observation at a position in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub index: u64,
    pub value: f64,
}

/// An ordered sequence of observations for one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct SensorSeries {
    observations: Vec<Observation>,
}

impl SensorSeries {
    /// Build a series, rejecting any index that does not strictly increase.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        check_increasing(observations.iter().map(|o| o.index))?;
        Ok(Self { observations })
    }

    /// Build a series from raw values indexed `0..n`.
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            observations: values
                .iter()
                .enumerate()
                .map(|(i, &value)| Observation {
                    index: i as u64,
                    value,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Values in index order.
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Positions in index order.
    pub fn indices(&self) -> Vec<u64> {
        self.observations.iter().map(|o| o.index).collect()
    }
}

impl TryFrom<Vec<Observation>> for SensorSeries {
    type Error = PipelineError;

    fn try_from(observations: Vec<Observation>) -> Result<Self> {
        Self::new(observations)
    }
}

impl From<SensorSeries> for Vec<Observation> {
    fn from(series: SensorSeries) -> Self {
        series.observations
    }
}

/// A named channel inside a [`TabularSeries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub values: Vec<f64>,
}

/// Several named channels aligned on one strictly increasing index.
///
/// Channels keep their insertion order, which fixes the feature column order
/// downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularSeries {
    index: Vec<u64>,
    channels: Vec<Channel>,
}

impl TabularSeries {
    /// Create an empty table over the given index.
    pub fn with_index(index: Vec<u64>) -> Result<Self> {
        check_increasing(index.iter().copied())?;
        Ok(Self {
            index,
            channels: Vec::new(),
        })
    }

    /// Create an empty table indexed `0..len`.
    pub fn with_len(len: usize) -> Self {
        Self {
            index: (0..len as u64).collect(),
            channels: Vec::new(),
        }
    }

    /// Add a channel. It must have one value per index position and a name
    /// not already in use.
    pub fn push_channel(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(PipelineError::InvalidSeries(format!(
                "channel '{name}' has {} values for {} index positions",
                values.len(),
                self.index.len()
            )));
        }
        if self.channels.iter().any(|c| c.name == name) {
            return Err(PipelineError::InvalidSeries(format!(
                "channel '{name}' already present"
            )));
        }
        self.channels.push(Channel { name, values });
        Ok(())
    }

    /// Builder-style [`push_channel`](Self::push_channel).
    pub fn with_channel(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_channel(name, values)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[u64] {
        &self.index
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of one channel.
    pub fn channel(&self, name: &str) -> Result<&[f64]> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| PipelineError::UnknownChannel(name.to_string()))
    }

    pub(crate) fn channel_mut(&mut self, name: &str) -> Result<&mut Vec<f64>> {
        self.channels
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.values)
            .ok_or_else(|| PipelineError::UnknownChannel(name.to_string()))
    }

    /// One channel as a standalone [`SensorSeries`].
    pub fn sensor_series(&self, name: &str) -> Result<SensorSeries> {
        let values = self.channel(name)?;
        Ok(SensorSeries {
            observations: self
                .index
                .iter()
                .zip(values)
                .map(|(&index, &value)| Observation { index, value })
                .collect(),
        })
    }

    /// Raw values of the given channels as a row-per-index matrix.
    pub fn raw_matrix<S: AsRef<str>>(&self, channels: &[S]) -> Result<FeatureMatrix> {
        let columns = channels
            .iter()
            .map(|c| self.channel(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut data = Vec::with_capacity(self.len() * columns.len());
        for row in 0..self.len() {
            data.extend(columns.iter().map(|values| values[row]));
        }
        FeatureMatrix::new(self.len(), columns.len(), data)
    }

    /// Whether every value in every channel is finite.
    pub fn is_finite(&self) -> bool {
        self.channels
            .iter()
            .all(|c| c.values.iter().all(|v| v.is_finite()))
    }

    /// The first `n` rows (or all rows if the table is shorter).
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        self.slice(0, n)
    }

    /// Rows from position `start` to the end.
    pub fn tail_from(&self, start: usize) -> Self {
        let start = start.min(self.len());
        self.slice(start, self.len())
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            index: self.index[start..end].to_vec(),
            channels: self
                .channels
                .iter()
                .map(|c| Channel {
                    name: c.name.clone(),
                    values: c.values[start..end].to_vec(),
                })
                .collect(),
        }
    }
}

/// JSON layout: `{"index": [...], "channels": {"temperature": [...], ...}}`.
/// `index` may be omitted, in which case rows are indexed `0..n`.
#[derive(Deserialize)]
struct RawTabularSeries {
    #[serde(default)]
    index: Option<Vec<u64>>,
    channels: serde_json::Map<String, serde_json::Value>,
}

impl Serialize for TabularSeries {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        struct ChannelMap<'a>(&'a [Channel]);

        impl Serialize for ChannelMap<'_> {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_map(self.0.iter().map(|c| (&c.name, &c.values)))
            }
        }

        let mut state = serializer.serialize_struct("TabularSeries", 2)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("channels", &ChannelMap(&self.channels))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for TabularSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let raw = RawTabularSeries::deserialize(deserializer)?;
        let mut columns = Vec::with_capacity(raw.channels.len());
        for (name, value) in raw.channels {
            let values: Vec<f64> = serde_json::from_value(value).map_err(D::Error::custom)?;
            columns.push((name, values));
        }

        let len = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut table = match raw.index {
            Some(index) => TabularSeries::with_index(index).map_err(D::Error::custom)?,
            None => TabularSeries::with_len(len),
        };
        for (name, values) in columns {
            table.push_channel(name, values).map_err(D::Error::custom)?;
        }
        Ok(table)
    }
}

fn check_increasing(indices: impl Iterator<Item = u64>) -> Result<()> {
    let mut previous: Option<u64> = None;
    for index in indices {
        if let Some(prev) = previous {
            if index <= prev {
                return Err(PipelineError::InvalidSeries(format!(
                    "index {index} does not follow {prev}"
                )));
            }
        }
        previous = Some(index);
    }
    Ok(())
}
