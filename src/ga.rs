//! A module for evaluating the fitness of many individuals at once.
//!
//! Each individual owns its own tree, so fitness evaluation is embarrassingly parallel: the
//! population is spread across a thread pool and the results gathered and ranked. A single
//! individual that fails to evaluate is ranked as least fit rather than aborting the batch.

use crate::gp::tree::TreeExpr;
use scoped_threadpool::Pool as ThreadPool;
use std::cmp::Ordering;
use std::mem;
use std::sync::mpsc;

// Traits.

/// An **Individual** (sometimes referred to as "Phenotype") within a population.
///
/// `E` is the environment in which the individual's fitness is tested.
pub trait Individual<E>: Send + Sync {
    /// The measurement of fitness.
    type Fitness: Fitness;
    /// Evaluate the fitness of the individual within the given environment.
    fn fitness(&self, environment: &E) -> Self::Fitness;
}

/// Types representing a measurement of fitness, where greater is fitter.
pub trait Fitness: Send + Sync + PartialOrd {}

// Model.

/// A population along with the fitness of each individual, sorted from least to most fit.
pub struct Ranking<I, E>
where
    I: Individual<E>,
{
    population: Vec<(I, I::Fitness)>,
}

/// Sensor readings paired with the value an individual should produce for each.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Samples {
    /// One sensor vector per sample.
    pub inputs: Vec<Vec<f64>>,
    /// The expected output for each sample.
    pub targets: Vec<f64>,
}

/// Mean squared error against a set of `Samples`. Lower error is fitter.
///
/// A non-finite error is less fit than any finite error.
#[derive(Copy, Clone, Debug)]
pub struct Cost(pub f64);

// Impls.

impl<I, E> Ranking<I, E>
where
    I: Individual<E>,
    E: Sync,
{
    /// Evaluate and rank the given individuals using one thread per CPU.
    pub fn new<Is>(individuals: Is, environment: &E) -> Self
    where
        Is: IntoIterator<Item = I>,
    {
        Self::with_num_threads(individuals, environment, num_cpus::get() as _)
    }

    /// Evaluate and rank the given individuals.
    ///
    /// Also allows for specifying the number of threads to use.
    pub fn with_num_threads<Is>(individuals: Is, environment: &E, num_threads: u32) -> Self
    where
        Is: IntoIterator<Item = I>,
    {
        // Use a threadpool for evaluating fitness.
        let mut thread_pool = ThreadPool::new(num_threads.max(1));

        // Calculate the fitness of the population.
        let (tx, rx) = mpsc::channel();
        thread_pool.scoped(|scoped| {
            for indv in individuals {
                let tx = tx.clone();
                scoped.execute(move || {
                    let fit = indv.fitness(environment);
                    // The receiver outlives the pool.
                    let _ = tx.send((indv, fit));
                });
            }
        });
        mem::drop(tx);
        let mut population = rx.iter().collect::<Vec<_>>();

        // Sort the population by fitness.
        population.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Less));

        Ranking { population }
    }

    /// View the population and their fitness.
    ///
    /// This slice will always be sorted by its fitness.
    pub fn population(&self) -> &[(I, I::Fitness)] {
        &self.population
    }

    /// The individual with the greatest fitness.
    pub fn most_fit(&self) -> Option<&(I, I::Fitness)> {
        self.population().iter().last()
    }

    /// The individual with the worst fitness.
    pub fn least_fit(&self) -> Option<&(I, I::Fitness)> {
        self.population().iter().next()
    }

    /// Consume the ranking, producing the sorted population.
    pub fn into_population(self) -> Vec<(I, I::Fitness)> {
        self.population
    }
}

impl Samples {
    pub fn new(inputs: Vec<Vec<f64>>, targets: Vec<f64>) -> Self {
        Samples { inputs, targets }
    }

    pub fn len(&self) -> usize {
        self.inputs.len().min(self.targets.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cost {
    /// The least fit cost possible.
    pub const WORST: Cost = Cost(f64::INFINITY);

    pub fn is_valid(&self) -> bool {
        self.0.is_finite()
    }
}

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    /// Greater is fitter: a lower error compares greater and every non-finite error compares
    /// least.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_valid(), other.is_valid()) {
            (true, true) => other.0.partial_cmp(&self.0).unwrap_or(Ordering::Equal),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => Ordering::Equal,
        }
    }
}

impl Individual<Samples> for TreeExpr {
    type Fitness = Cost;
    fn fitness(&self, samples: &Samples) -> Cost {
        if samples.is_empty() {
            return Cost::WORST;
        }
        let mut sum = 0.0;
        for (sensors, target) in samples.inputs.iter().zip(&samples.targets) {
            match self.calculate_expression(sensors) {
                Ok(value) => sum += (value - target).powi(2),
                Err(_) => return Cost::WORST,
            }
        }
        let mse = sum / samples.len() as f64;
        if mse.is_finite() {
            Cost(mse)
        } else {
            Cost::WORST
        }
    }
}

// Fitness

impl<T> Fitness for T where T: Send + Sync + PartialOrd {}
