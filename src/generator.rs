//! Assembles vehicle specifications before a run.

use crate::{
    ConfigurationError, StartingStateOverrides, VehicleConfig, VehicleConfigOverrides, VehicleSpec,
};
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};

/// Builds the list of [VehicleSpec]s fed into a [Simulation](crate::Simulation).
///
/// Every vehicle gets the generator's default overrides, except those added with
/// [add_special_vehicle](Self::add_special_vehicle), which bring their own.
#[derive(Clone, Debug, Default)]
pub struct VehicleGenerator {
    config: VehicleConfigOverrides,
    start: StartingStateOverrides,
    specs: Vec<VehicleSpec>,
}

impl VehicleGenerator {
    /// Creates a generator whose vehicles use the given overrides.
    pub fn new(config: VehicleConfigOverrides, start: StartingStateOverrides) -> Self {
        Self {
            config,
            start,
            specs: vec![],
        }
    }

    /// Adds a default vehicle.
    pub fn add_vehicle<S: AsRef<str>>(&mut self, route: &[S], spawn_time: f64) {
        self.push(route, spawn_time, self.config, self.start);
    }

    /// Adds a default vehicle for each spawn time.
    pub fn add_vehicles<S: AsRef<str>>(
        &mut self,
        route: &[S],
        spawn_times: impl IntoIterator<Item = f64>,
    ) {
        for spawn_time in spawn_times {
            self.add_vehicle(route, spawn_time);
        }
    }

    /// Adds a vehicle with its own parameter and starting state overrides.
    /// These replace the generator's defaults rather than adding to them.
    pub fn add_special_vehicle<S: AsRef<str>>(
        &mut self,
        route: &[S],
        spawn_time: f64,
        config: VehicleConfigOverrides,
        start: StartingStateOverrides,
    ) {
        self.push(route, spawn_time, config, start);
    }

    /// Adds `count` default vehicles, the first at `first` and then every `interval` seconds.
    pub fn add_periodic_vehicles<S: AsRef<str>>(
        &mut self,
        route: &[S],
        first: f64,
        interval: f64,
        count: usize,
    ) -> Result<(), ConfigurationError> {
        if !(interval > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "interval",
                value: interval,
            });
        }
        self.add_vehicles(route, (0..count).map(|i| first + i as f64 * interval));
        Ok(())
    }

    /// Adds default vehicles arriving as a Poisson process with `rate` vehicles
    /// per second, between `start` and `end`. Returns the number of vehicles added.
    pub fn add_poisson_vehicles<S: AsRef<str>, R: Rng + ?Sized>(
        &mut self,
        route: &[S],
        rate: f64,
        start: f64,
        end: f64,
        rng: &mut R,
    ) -> Result<usize, ConfigurationError> {
        let headways = Exp::new(rate).map_err(|_| ConfigurationError::InvalidParameter {
            name: "rate",
            value: rate,
        })?;
        let mut count = 0;
        let mut time = start + headways.sample(rng);
        while time < end {
            self.add_vehicle(route, time);
            count += 1;
            time += headways.sample(rng);
        }
        Ok(count)
    }

    /// Scales each vehicle's desired velocity by a factor sampled from a normal
    /// distribution with a mean of 1 and standard deviation of `stddev`,
    /// clamped to between 0.75 and 1.25.
    pub fn randomise_desired_velocity<R: Rng + ?Sized>(
        &mut self,
        stddev: f64,
        rng: &mut R,
    ) -> Result<(), ConfigurationError> {
        if !(stddev >= 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "stddev",
                value: stddev,
            });
        }
        let distr = Normal::new(1.0, stddev).map_err(|_| ConfigurationError::InvalidParameter {
            name: "stddev",
            value: stddev,
        })?;
        let default_vel = VehicleConfig::default().desired_velocity;
        for spec in &mut self.specs {
            let factor = distr.sample(rng).clamp(0.75, 1.25);
            let vel = spec.config.desired_velocity.unwrap_or(default_vel);
            spec.config.desired_velocity = Some(factor * vel);
        }
        Ok(())
    }

    /// The specifications added so far, in the order they were added.
    pub fn specifications(&self) -> &[VehicleSpec] {
        &self.specs
    }

    /// Consumes the generator, returning the specifications.
    pub fn into_specifications(self) -> Vec<VehicleSpec> {
        self.specs
    }

    fn push<S: AsRef<str>>(
        &mut self,
        route: &[S],
        spawn_time: f64,
        config: VehicleConfigOverrides,
        start: StartingStateOverrides,
    ) {
        self.specs.push(
            VehicleSpec::new(route, spawn_time)
                .with_config(config)
                .with_start(start),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> VehicleGenerator {
        VehicleGenerator::new(
            VehicleConfigOverrides {
                desired_velocity: Some(15.0),
                ..Default::default()
            },
            StartingStateOverrides {
                velocity: Some(15.0),
                ..Default::default()
            },
        )
    }

    #[test]
    fn applies_defaults() {
        let mut gen = generator();
        gen.add_vehicles(&["Street1", "Street3"], [5.0, 10.0]);
        let specs = gen.specifications();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].route, vec!["Street1", "Street3"]);
        assert_eq!(specs[1].spawn_time, 10.0);
        assert_eq!(specs[0].config.desired_velocity, Some(15.0));
        assert_eq!(specs[0].start.velocity, Some(15.0));
    }

    #[test]
    fn special_vehicles_replace_defaults() {
        let mut gen = generator();
        gen.add_special_vehicle(
            &["A4"],
            0.0,
            VehicleConfigOverrides {
                length: Some(4.0),
                ..Default::default()
            },
            StartingStateOverrides {
                position: Some(400.0),
                ..Default::default()
            },
        );
        let spec = &gen.into_specifications()[0];
        assert_eq!(spec.config.length, Some(4.0));
        assert_eq!(spec.start.position, Some(400.0));
        assert_eq!(spec.config.desired_velocity, None);
        assert_eq!(spec.start.velocity, None);
    }

    #[test]
    fn periodic_vehicles() {
        let mut gen = VehicleGenerator::default();
        gen.add_periodic_vehicles(&["Street2"], 10.1, 10.0, 3).unwrap();
        let times = gen
            .specifications()
            .iter()
            .map(|s| s.spawn_time)
            .collect::<Vec<_>>();
        assert_eq!(times, vec![10.1, 20.1, 30.1]);
        assert!(gen.add_periodic_vehicles(&["Street2"], 0.0, 0.0, 3).is_err());
    }

    #[test]
    fn poisson_vehicles() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut gen = VehicleGenerator::default();
        let count = gen
            .add_poisson_vehicles(&["A4"], 0.5, 0.0, 1000.0, &mut rng)
            .unwrap();
        assert_eq!(count, gen.specifications().len());
        // Expect around 500 arrivals
        assert!((400..600).contains(&count));
        let times = gen.specifications().iter().map(|s| s.spawn_time);
        assert!(times.clone().all(|t| (0.0..1000.0).contains(&t)));
        assert!(times.clone().zip(times.skip(1)).all(|(a, b)| a < b));

        assert!(gen
            .add_poisson_vehicles(&["A4"], -1.0, 0.0, 10.0, &mut rng)
            .is_err());
    }

    #[test]
    fn randomise_desired_velocity() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut gen = generator();
        gen.add_periodic_vehicles(&["A4"], 0.0, 1.0, 200).unwrap();
        gen.randomise_desired_velocity(0.5, &mut rng).unwrap();

        let vels = gen
            .specifications()
            .iter()
            .map(|s| s.config.desired_velocity.unwrap())
            .collect::<Vec<_>>();
        assert!(vels.iter().all(|v| (11.25..=18.75).contains(v)));
        assert!(vels.iter().any(|v| *v != 15.0));
        assert!(gen.randomise_desired_velocity(-1.0, &mut rng).is_err());
    }
}
