// libsvm model artifacts, evaluated without linking libsvm.
//
// Only what the match classifier needs is supported: a two-class C-SVC with
// a linear, polynomial, RBF or sigmoid kernel, trained with probability
// estimates (probA/probB present). The text format is the one written by
// svm_save_model:
//
//   svm_type c_svc
//   kernel_type linear
//   nr_class 2
//   total_sv 3
//   rho -0.12
//   label 1 0
//   probA -4.2
//   probB 0.07
//   nr_sv 2 1
//   SV
//   0.5 1:0 2:0.3 3:1 4:1 5:12
//   ...
//
// Feature indices are 1-based; input slot i is index i + 1.

use std::path::Path;
use std::str::FromStr;

use super::error::ClassifierError;

/// Lower bound libsvm applies to pairwise probabilities.
const MIN_PROB: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    Polynomial { gamma: f64, coef0: f64, degree: i32 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

#[derive(Debug, Clone, PartialEq)]
struct SupportVector {
    coef: f64,
    /// (1-based index, value), as stored in the artifact
    nodes: Vec<(usize, f64)>,
}

impl SupportVector {
    fn dot(&self, x: &[f64]) -> f64 {
        self.nodes
            .iter()
            .map(|&(i, v)| v * x.get(i - 1).copied().unwrap_or(0.0))
            .sum()
    }

    fn squared_distance(&self, x: &[f64]) -> f64 {
        let mut dense = x.to_vec();
        for &(i, v) in &self.nodes {
            if i > dense.len() {
                dense.resize(i, 0.0);
            }
            dense[i - 1] -= v;
        }
        dense.iter().map(|d| d * d).sum()
    }
}

/// A loaded two-class probabilistic SVM.
#[derive(Debug, Clone, PartialEq)]
pub struct SvmModel {
    kernel: Kernel,
    rho: f64,
    /// Class labels in model order; probabilities follow this order
    labels: [i32; 2],
    prob_a: f64,
    prob_b: f64,
    support_vectors: Vec<SupportVector>,
    /// Highest feature index any support vector uses
    dimension: usize,
}

impl SvmModel {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let text = std::fs::read_to_string(path).map_err(|e| ClassifierError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        text.parse()
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn labels(&self) -> [i32; 2] {
        self.labels
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.len()
    }

    /// Highest feature index the model reads.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Signed distance from the separating surface; positive favours
    /// `labels()[0]`.
    pub fn decision_value(&self, x: &[f64]) -> Result<f64, ClassifierError> {
        if x.len() < self.dimension {
            return Err(ClassifierError::Dimension {
                expected: self.dimension,
                got: x.len(),
            });
        }

        let sum: f64 = self
            .support_vectors
            .iter()
            .map(|sv| sv.coef * self.kernel_value(sv, x))
            .sum();
        Ok(sum - self.rho)
    }

    /// Probability of each label, in `labels()` order.
    pub fn probabilities(&self, x: &[f64]) -> Result<[f64; 2], ClassifierError> {
        let decision = self.decision_value(x)?;
        let p = platt(decision, self.prob_a, self.prob_b).clamp(MIN_PROB, 1.0 - MIN_PROB);
        Ok([p, 1.0 - p])
    }

    fn kernel_value(&self, sv: &SupportVector, x: &[f64]) -> f64 {
        match self.kernel {
            Kernel::Linear => sv.dot(x),
            Kernel::Polynomial { gamma, coef0, degree } => (gamma * sv.dot(x) + coef0).powi(degree),
            Kernel::Rbf { gamma } => (-gamma * sv.squared_distance(x)).exp(),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * sv.dot(x) + coef0).tanh(),
        }
    }
}

/// Platt sigmoid `1 / (1 + exp(dec * A + B))`, evaluated without overflow.
fn platt(decision: f64, a: f64, b: f64) -> f64 {
    let f = decision * a + b;
    if f >= 0.0 {
        (-f).exp() / (1.0 + (-f).exp())
    } else {
        1.0 / (1.0 + f.exp())
    }
}

#[derive(Default)]
struct Header {
    svm_type: Option<String>,
    kernel_type: Option<String>,
    degree: Option<i32>,
    gamma: Option<f64>,
    coef0: Option<f64>,
    nr_class: Option<usize>,
    total_sv: Option<usize>,
    rho: Option<f64>,
    labels: Option<[i32; 2]>,
    prob_a: Option<f64>,
    prob_b: Option<f64>,
}

fn parse_num<T: FromStr>(line: usize, key: &str, raw: &str) -> Result<T, ClassifierError> {
    raw.parse()
        .map_err(|_| ClassifierError::parse(line, format!("{key}: {raw:?} is not a number")))
}

fn parse_pair<T: FromStr + Copy>(line: usize, key: &str, values: &[&str]) -> Result<[T; 2], ClassifierError> {
    if values.len() != 2 {
        return Err(ClassifierError::parse(
            line,
            format!("{key}: expected 2 values, got {}", values.len()),
        ));
    }
    Ok([
        parse_num(line, key, values[0])?,
        parse_num(line, key, values[1])?,
    ])
}

fn parse_single<T: FromStr>(line: usize, key: &str, values: &[&str]) -> Result<T, ClassifierError> {
    match values {
        [v] => parse_num(line, key, v),
        _ => Err(ClassifierError::parse(line, format!("{key}: expected 1 value"))),
    }
}

impl FromStr for SvmModel {
    type Err = ClassifierError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut header = Header::default();
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
        let mut sv_start = None;

        for (n, line) in lines.by_ref() {
            if line.is_empty() {
                continue;
            }
            if line == "SV" {
                sv_start = Some(n);
                break;
            }

            let mut parts = line.split_whitespace();
            let key = parts.next().unwrap_or_default();
            let values: Vec<&str> = parts.collect();
            match key {
                "svm_type" => header.svm_type = Some(parse_single(n, key, &values)?),
                "kernel_type" => header.kernel_type = Some(parse_single(n, key, &values)?),
                "degree" => header.degree = Some(parse_single(n, key, &values)?),
                "gamma" => header.gamma = Some(parse_single(n, key, &values)?),
                "coef0" => header.coef0 = Some(parse_single(n, key, &values)?),
                "nr_class" => header.nr_class = Some(parse_single(n, key, &values)?),
                "total_sv" => header.total_sv = Some(parse_single(n, key, &values)?),
                "rho" => header.rho = Some(parse_single(n, key, &values)?),
                "label" => header.labels = Some(parse_pair(n, key, &values)?),
                "probA" => header.prob_a = Some(parse_single(n, key, &values)?),
                "probB" => header.prob_b = Some(parse_single(n, key, &values)?),
                // Per-class counts; total_sv is what we check against.
                "nr_sv" => {
                    parse_pair::<usize>(n, key, &values)?;
                }
                other => {
                    return Err(ClassifierError::parse(n, format!("unknown header field {other:?}")));
                }
            }
        }

        let sv_line = sv_start.ok_or_else(|| ClassifierError::parse(0, "missing SV section"))?;
        let header_err = |reason: &str| ClassifierError::parse(sv_line, reason.to_string());

        match header.svm_type.as_deref() {
            Some("c_svc") => {}
            Some(other) => return Err(header_err(&format!("unsupported svm_type {other}"))),
            None => return Err(header_err("missing svm_type")),
        }
        if header.nr_class != Some(2) {
            return Err(header_err("only two-class models are supported"));
        }

        let gamma = header.gamma.unwrap_or(0.0);
        let coef0 = header.coef0.unwrap_or(0.0);
        let kernel = match header.kernel_type.as_deref() {
            Some("linear") => Kernel::Linear,
            Some("polynomial") => Kernel::Polynomial {
                gamma,
                coef0,
                degree: header.degree.unwrap_or(3),
            },
            Some("rbf") => Kernel::Rbf { gamma },
            Some("sigmoid") => Kernel::Sigmoid { gamma, coef0 },
            Some(other) => return Err(header_err(&format!("unsupported kernel_type {other}"))),
            None => return Err(header_err("missing kernel_type")),
        };

        let labels = header.labels.ok_or_else(|| header_err("missing label"))?;
        let rho = header.rho.ok_or_else(|| header_err("missing rho"))?;
        let (prob_a, prob_b) = match (header.prob_a, header.prob_b) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(header_err("model was trained without probability estimates")),
        };

        let mut support_vectors = Vec::new();
        for (n, line) in lines {
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let coef: f64 = parse_num(n, "coef", tokens.next().unwrap_or_default())?;

            let mut nodes = Vec::new();
            for token in tokens {
                let (index, value) = token
                    .split_once(':')
                    .ok_or_else(|| ClassifierError::parse(n, format!("expected index:value, got {token:?}")))?;
                let index: usize = parse_num(n, "index", index)?;
                if index == 0 {
                    return Err(ClassifierError::parse(n, "feature indices start at 1"));
                }
                nodes.push((index, parse_num(n, "value", value)?));
            }
            support_vectors.push(SupportVector { coef, nodes });
        }

        if let Some(total) = header.total_sv {
            if total != support_vectors.len() {
                return Err(header_err(&format!(
                    "total_sv is {total} but {} support vectors follow",
                    support_vectors.len()
                )));
            }
        }

        let dimension = support_vectors
            .iter()
            .flat_map(|sv| sv.nodes.iter().map(|&(i, _)| i))
            .max()
            .unwrap_or(0);

        Ok(SvmModel {
            kernel,
            rho,
            labels,
            prob_a,
            prob_b,
            support_vectors,
            dimension,
        })
    }
}
