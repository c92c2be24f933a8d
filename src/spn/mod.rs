//! Mixed Sum-Product Networks
//!
//! Structure learning in the LearnSPN family, for data mixing continuous and
//! discrete variables:
//!
//! 1. A slice over one variable becomes a [`HistogramLeaf`].
//! 2. A slice with fewer than `min_instances_slice` rows is fully factorized.
//! 3. Columns constant in the slice are split off as leaves.
//! 4. Columns are grouped into connected components of the RDC graph
//!    (edges where RDC exceeds `threshold`); several components give a
//!    product node.
//! 5. Otherwise rows are clustered with k-means and the clusters become the
//!    children of a sum node weighted by cluster size.
//!
//! Nodes live in an arena where children always precede their parent, so
//! inference is a single forward pass and the root is the last node.

pub mod clustering;
pub mod leaf;
pub mod rdc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::context::Domain;
use crate::method::NumericalWarning;
use crate::{Context, Error, Matrix, Result};

pub use leaf::HistogramLeaf;

/// Default minimum number of rows a slice needs to be split further.
pub const DEFAULT_MIN_INSTANCES_SLICE: usize = 20;

/// Default RDC threshold above which two variables are considered dependent.
pub const DEFAULT_RDC_THRESHOLD: f64 = 0.3;

/// Default seed of the learner's random generator.
pub const DEFAULT_SEED: u64 = 17;

/// Structure learning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnerParams {
    /// Minimum rows for a slice to be split further
    pub min_instances_slice: usize,
    /// RDC dependency threshold
    pub threshold: f64,
    /// Number of clusters per sum node
    pub n_clusters: usize,
    /// Seed for RDC projections and k-means seeding
    pub seed: u64,
}

impl Default for LearnerParams {
    fn default() -> Self {
        Self {
            min_instances_slice: DEFAULT_MIN_INSTANCES_SLICE,
            threshold: DEFAULT_RDC_THRESHOLD,
            n_clusters: 2,
            seed: DEFAULT_SEED,
        }
    }
}

/// One node of the network.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Weighted mixture over children with the same scope
    Sum {
        /// Child node indices
        children: Vec<usize>,
        /// Log mixture weights (sum to one in probability space)
        log_weights: Vec<f64>,
    },
    /// Factorization over children with disjoint scopes
    Product {
        /// Child node indices
        children: Vec<usize>,
    },
    /// Univariate distribution
    Leaf(HistogramLeaf),
}

/// A learned sum-product network.
#[derive(Debug, Clone, PartialEq)]
pub struct Spn {
    nodes: Vec<Node>,
    n_vars: usize,
}

impl Spn {
    /// Learn a structure and its parameters from `data`.
    ///
    /// `context` must already carry the domains of this fold (see
    /// [`Context::add_domains`]).
    ///
    /// # Errors
    ///
    /// - [`Error::SchemaMismatch`] if `data` does not fit the context's schema
    /// - [`Error::InvalidConfig`] if the context has no domains
    /// - [`Error::Numerical`] if `data` has no rows
    pub fn learn(
        data: &Matrix,
        context: &Context,
        params: &LearnerParams,
    ) -> Result<(Self, Vec<NumericalWarning>)> {
        context.schema().validate(data, "SPN training data")?;
        if data.rows() == 0 {
            return Err(Error::Numerical(
                "cannot learn an SPN from empty training data".to_string(),
            ));
        }
        let domains = (0..data.cols())
            .map(|col| context.domain(col))
            .collect::<Option<Vec<&Domain>>>()
            .ok_or_else(|| {
                Error::InvalidConfig("SPN context has no domains; call add_domains first".to_string())
            })?;

        let mut learner = Learner {
            data,
            domains,
            params,
            rng: StdRng::seed_from_u64(params.seed),
            nodes: Vec::new(),
            warnings: Vec::new(),
        };
        learner.build((0..data.rows()).collect(), (0..data.cols()).collect());

        let spn = Self {
            nodes: learner.nodes,
            n_vars: data.cols(),
        };
        debug!(
            nodes = spn.node_count(),
            leaves = spn.leaf_count(),
            "learned SPN structure"
        );
        Ok((spn, learner.warnings))
    }

    /// All nodes; the root is the last one
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Total number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }

    /// Log-likelihood of a single row. `NaN` entries are marginalized.
    #[must_use]
    pub fn log_likelihood(&self, row: &[f64]) -> f64 {
        let mut values = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let value = match node {
                Node::Leaf(leaf) => leaf.log_density(row[leaf.var()]),
                Node::Product { children } => children.iter().map(|&c| values[c]).sum::<f64>(),
                Node::Sum {
                    children,
                    log_weights,
                } => log_sum_exp(children.iter().zip(log_weights).map(|(&c, w)| w + values[c])),
            };
            values.push(value);
        }
        values.last().copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// Log-likelihood of every row of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if `data` has the wrong width
    pub fn log_likelihood_rows(&self, data: &Matrix) -> Result<Vec<f64>> {
        if data.cols() != self.n_vars {
            return Err(Error::SchemaMismatch {
                context: "SPN scoring data".to_string(),
                expected: self.n_vars,
                actual: data.cols(),
            });
        }
        Ok(data.iter_rows().map(|row| self.log_likelihood(row)).collect())
    }
}

/// `ln Σ exp(x)` without overflow.
fn log_sum_exp(terms: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = terms.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + terms.map(|t| (t - max).exp()).sum::<f64>().ln()
}

struct Learner<'a> {
    data: &'a Matrix,
    domains: Vec<&'a Domain>,
    params: &'a LearnerParams,
    rng: StdRng,
    nodes: Vec<Node>,
    warnings: Vec<NumericalWarning>,
}

impl Learner<'_> {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn build(&mut self, rows: Vec<usize>, scope: Vec<usize>) -> usize {
        if scope.len() == 1 {
            return self.leaf(&rows, scope[0]);
        }
        if rows.len() < self.params.min_instances_slice {
            return self.naive_factorization(&rows, &scope);
        }

        let (constant, varying): (Vec<usize>, Vec<usize>) =
            scope.iter().partition(|&&col| self.is_constant(&rows, col));
        if varying.is_empty() {
            return self.naive_factorization(&rows, &scope);
        }
        if !constant.is_empty() {
            let mut children: Vec<usize> = constant.iter().map(|&col| self.leaf(&rows, col)).collect();
            children.push(self.build(rows, varying));
            return self.push(Node::Product { children });
        }

        let components = self.independent_components(&rows, &scope);
        if components.len() > 1 {
            let children = components
                .into_iter()
                .map(|component| self.build(rows.clone(), component))
                .collect();
            return self.push(Node::Product { children });
        }

        self.cluster(rows, scope)
    }

    fn leaf(&mut self, rows: &[usize], var: usize) -> usize {
        let values: Vec<f64> = rows.iter().map(|&r| self.data.get(r, var)).collect();
        let leaf = HistogramLeaf::fit(var, &values, self.domains[var]);
        self.push(Node::Leaf(leaf))
    }

    fn naive_factorization(&mut self, rows: &[usize], scope: &[usize]) -> usize {
        if let [var] = scope {
            return self.leaf(rows, *var);
        }
        let children = scope.iter().map(|&var| self.leaf(rows, var)).collect();
        self.push(Node::Product { children })
    }

    fn is_constant(&self, rows: &[usize], col: usize) -> bool {
        let mut observed = rows.iter().map(|&r| self.data.get(r, col)).filter(|v| !v.is_nan());
        observed
            .next()
            .map_or(true, |first| observed.all(|v| v.to_bits() == first.to_bits()))
    }

    /// Connected components of the graph linking columns with RDC above the threshold.
    fn independent_components(&mut self, rows: &[usize], scope: &[usize]) -> Vec<Vec<usize>> {
        let domains: Vec<&Domain> = scope.iter().map(|&col| self.domains[col]).collect();
        let rdc = rdc::rdc_matrix(self.data, rows, scope, &domains, &mut self.rng, &mut self.warnings);

        let mut component = vec![usize::MAX; scope.len()];
        let mut components = Vec::new();
        for start in 0..scope.len() {
            if component[start] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = Vec::new();
            let mut stack = vec![start];
            component[start] = id;
            while let Some(i) = stack.pop() {
                members.push(scope[i]);
                for j in 0..scope.len() {
                    if component[j] == usize::MAX && rdc[i][j] > self.params.threshold {
                        component[j] = id;
                        stack.push(j);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    fn cluster(&mut self, rows: Vec<usize>, scope: Vec<usize>) -> usize {
        let points = clustering::normalize(self.data, &rows, &scope);
        let Some(labels) = clustering::kmeans(&points, self.params.n_clusters, &mut self.rng) else {
            self.warnings.push(NumericalWarning::new(
                "spn",
                format!(
                    "clustering of {} rows collapsed to one cluster; factorizing",
                    rows.len()
                ),
            ));
            return self.naive_factorization(&rows, &scope);
        };

        let n_clusters = labels.iter().copied().max().map_or(0, |m| m + 1);
        let mut groups = vec![Vec::new(); n_clusters];
        for (&row, &label) in rows.iter().zip(&labels) {
            groups[label].push(row);
        }

        #[allow(clippy::cast_precision_loss)]
        let total = rows.len() as f64;
        let mut children = Vec::with_capacity(n_clusters);
        let mut log_weights = Vec::with_capacity(n_clusters);
        for group in groups {
            #[allow(clippy::cast_precision_loss)]
            log_weights.push((group.len() as f64 / total).ln());
            children.push(self.build(group, scope.clone()));
        }
        self.push(Node::Sum {
            children,
            log_weights,
        })
    }
}
