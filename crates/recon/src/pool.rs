//! The shared bunker-delivery pool.
//!
//! A delivery leaves the pool the moment it is attributed to a reading and
//! is never re-added. Every matching pass in a run borrows the same pool
//! mutably, so a removal is visible to all later passes.

use chrono::{Duration, NaiveDateTime};

use crate::model::BunkerDelivery;

/// Stable slot index into a [`DeliveryPool`] (equals the delivery's load position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolIndex(pub usize);

#[derive(Debug, Clone, Default)]
pub struct DeliveryPool {
    slots: Vec<Option<BunkerDelivery>>,
    live: usize,
}

impl DeliveryPool {
    pub fn new(deliveries: Vec<BunkerDelivery>) -> Self {
        let live = deliveries.len();
        Self {
            slots: deliveries.into_iter().map(Some).collect(),
            live,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live deliveries in load order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &BunkerDelivery)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|d| (PoolIndex(i), d)))
    }

    /// Closest live delivery to `at` whose fuel type passes `accept`, if it
    /// lies within `window` (inclusive).
    ///
    /// Deliveries without a valid timestamp are never candidates. Ties go to
    /// the delivery loaded first.
    pub fn find_nearest_within<F>(&self, accept: F, at: NaiveDateTime, window: Duration) -> Option<PoolIndex>
    where
        F: Fn(&str) -> bool,
    {
        let mut best: Option<(PoolIndex, Duration)> = None;
        for (index, delivery) in self.iter() {
            if !accept(&delivery.fuel_type) {
                continue;
            }
            let Some(ts) = delivery.timestamp() else {
                continue;
            };
            let diff = (ts - at).abs();
            // Strict `<` keeps the earliest-loaded delivery on ties
            if best.map_or(true, |(_, d)| diff < d) {
                best = Some((index, diff));
            }
        }

        match best {
            Some((index, diff)) if diff <= window => Some(index),
            _ => None,
        }
    }

    /// Take a delivery out of the pool permanently.
    pub fn remove(&mut self, index: PoolIndex) -> Option<BunkerDelivery> {
        let taken = self.slots.get_mut(index.0).and_then(Option::take);
        if taken.is_some() {
            self.live -= 1;
        }
        taken
    }

    /// Remaining deliveries, in load order, consuming the pool.
    pub fn into_remaining(self) -> Vec<BunkerDelivery> {
        self.slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Stamp;

    fn delivery(id: usize, fuel: &str, date: &str, time: &str, mass: f64) -> BunkerDelivery {
        BunkerDelivery {
            id,
            stamp: Stamp::parse(date, time),
            fuel_type: fuel.into(),
            mass,
        }
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        Stamp::parse(date, time).at.unwrap()
    }

    fn is(code: &'static str) -> impl Fn(&str) -> bool {
        move |f: &str| f == code
    }

    #[test]
    fn nearest_within_window() {
        let pool = DeliveryPool::new(vec![
            delivery(0, "HFO", "01.01.2024", "02:00", 10.0),
            delivery(1, "HFO", "01.01.2024", "10:00", 50.0),
        ]);
        let found = pool.find_nearest_within(is("HFO"), at("01.01.2024", "12:00"), Duration::hours(12));
        assert_eq!(found, Some(PoolIndex(1)));
    }

    #[test]
    fn closest_outside_window_is_none() {
        let pool = DeliveryPool::new(vec![delivery(0, "HFO", "02.01.2024", "14:00", 10.0)]);
        let found = pool.find_nearest_within(is("HFO"), at("01.01.2024", "00:00"), Duration::hours(12));
        assert_eq!(found, None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let pool = DeliveryPool::new(vec![delivery(0, "HFO", "02.01.2024", "00:00", 10.0)]);
        let found = pool.find_nearest_within(is("HFO"), at("01.01.2024", "12:00"), Duration::hours(12));
        assert_eq!(found, Some(PoolIndex(0)));
    }

    #[test]
    fn tie_goes_to_first_loaded() {
        let pool = DeliveryPool::new(vec![
            delivery(0, "HFO", "01.01.2024", "18:00", 10.0),
            delivery(1, "HFO", "01.01.2024", "06:00", 20.0),
        ]);
        let found = pool.find_nearest_within(is("HFO"), at("01.01.2024", "12:00"), Duration::hours(12));
        assert_eq!(found, Some(PoolIndex(0)));
    }

    #[test]
    fn filter_and_invalid_timestamps() {
        let pool = DeliveryPool::new(vec![
            delivery(0, "MGO", "01.01.2024", "12:00", 10.0),
            delivery(1, "HFO", "garbage", "12:00", 20.0),
            delivery(2, "HFO", "01.01.2024", "15:00", 30.0),
        ]);
        let found = pool.find_nearest_within(is("HFO"), at("01.01.2024", "12:00"), Duration::hours(12));
        assert_eq!(found, Some(PoolIndex(2)));
    }

    #[test]
    fn remove_is_permanent() {
        let mut pool = DeliveryPool::new(vec![
            delivery(0, "HFO", "01.01.2024", "12:00", 10.0),
            delivery(1, "HFO", "01.01.2024", "13:00", 20.0),
        ]);
        let taken = pool.remove(PoolIndex(0)).unwrap();
        assert_eq!(taken.mass, 10.0);
        assert!(pool.remove(PoolIndex(0)).is_none());
        assert_eq!(pool.len(), 1);
        assert!(pool.iter().all(|(index, _)| index != PoolIndex(0)));

        let found = pool.find_nearest_within(is("HFO"), at("01.01.2024", "12:00"), Duration::hours(12));
        assert_eq!(found, Some(PoolIndex(1)));

        let rest = pool.into_remaining();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, 1);
    }

    #[test]
    fn empty_pool() {
        let pool = DeliveryPool::new(vec![]);
        assert!(pool.is_empty());
        let found = pool.find_nearest_within(|_| true, at("01.01.2024", "12:00"), Duration::hours(12));
        assert_eq!(found, None);
    }
}
