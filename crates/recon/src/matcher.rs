use chrono::Duration;
use serde::Serialize;

use crate::model::Reading;
use crate::pool::DeliveryPool;

/// One delivery attributed to one reading.
#[derive(Debug, Clone, Serialize)]
pub struct Attribution {
    /// Zero-based readings row.
    pub row: usize,
    pub delivery_id: usize,
    pub fuel_type: String,
    pub mass: f64,
    /// Delivery time minus reading time.
    pub offset_minutes: i64,
}

/// Bunkered mass per reading (aligned with the reading slice) plus the
/// attributions that produced it.
#[derive(Debug, Clone, Default)]
pub struct MatchOutput {
    pub bunkers: Vec<f64>,
    pub attributions: Vec<Attribution>,
}

impl MatchOutput {
    pub fn total(&self) -> f64 {
        self.bunkers.iter().sum()
    }
}

/// Greedy nearest-delivery matching in reading row order.
///
/// For each reading with a valid timestamp, the closest live delivery
/// accepted by `accept` is attributed if it lies within `window`, then
/// removed from the pool. Readings without a timestamp, or with nothing in
/// range, get zero.
pub fn match_exclusive<F>(
    readings: &[Reading],
    pool: &mut DeliveryPool,
    accept: F,
    window: Duration,
) -> MatchOutput
where
    F: Fn(&str) -> bool,
{
    let mut out = MatchOutput {
        bunkers: vec![0.0; readings.len()],
        attributions: Vec::new(),
    };

    for (i, reading) in readings.iter().enumerate() {
        let Some(at) = reading.timestamp() else {
            continue;
        };
        if pool.is_empty() {
            break;
        }
        let Some(index) = pool.find_nearest_within(&accept, at, window) else {
            continue;
        };
        let Some(delivery) = pool.remove(index) else {
            continue;
        };
        let offset_minutes = delivery
            .timestamp()
            .map(|ts| (ts - at).num_minutes())
            .unwrap_or_default();

        log::debug!(
            "row {}: delivery {} ({} {:.3}) attributed, offset {}m",
            reading.row,
            delivery.id,
            delivery.fuel_type,
            delivery.mass,
            offset_minutes
        );

        out.bunkers[i] += delivery.mass;
        out.attributions.push(Attribution {
            row: reading.row,
            delivery_id: delivery.id,
            fuel_type: delivery.fuel_type,
            mass: delivery.mass,
            offset_minutes,
        });
    }

    out
}

/// Per-fuel pass: only deliveries of exactly `code`.
pub fn match_fuel(readings: &[Reading], pool: &mut DeliveryPool, code: &str, window: Duration) -> MatchOutput {
    match_exclusive(readings, pool, |f| f == code, window)
}

/// BDN pass: any delivery whose fuel type is in the blend allow-list.
pub fn match_blends(
    readings: &[Reading],
    pool: &mut DeliveryPool,
    blends: &[String],
    window: Duration,
) -> MatchOutput {
    match_exclusive(readings, pool, |f| blends.iter().any(|b| b == f), window)
}
