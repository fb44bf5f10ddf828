// ─────────────────────────────────────────────────────────────────────
// MagNet — Split Masks
// ─────────────────────────────────────────────────────────────────────
//! Train/validation/test node sets for every split, stored as sorted
//! index lists.

use magnet_types::{MagNetError, MagNetResult};

/// Borrowed view of one split.
#[derive(Debug, Clone, Copy)]
pub struct SplitIndices<'a> {
    pub train: &'a [usize],
    pub val: &'a [usize],
    pub test: &'a [usize],
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitMasks {
    num_nodes: usize,
    train: Vec<Vec<usize>>,
    val: Vec<Vec<usize>>,
    test: Vec<Vec<usize>>,
}

fn indices_of(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &m)| m.then_some(i))
        .collect()
}

impl SplitMasks {
    /// Build from boolean masks of length `num_nodes`, one per split.
    ///
    /// A single test mask is shared by every split.
    pub fn from_bool(
        num_nodes: usize,
        train: &[Vec<bool>],
        val: &[Vec<bool>],
        test: &[Vec<bool>],
    ) -> MagNetResult<Self> {
        for (name, masks) in [("train", train), ("val", val), ("test", test)] {
            if let Some(m) = masks.iter().find(|m| m.len() != num_nodes) {
                return Err(MagNetError::Dataset(format!(
                    "{name} mask has length {}, expected {num_nodes}",
                    m.len()
                )));
            }
        }
        let conv = |masks: &[Vec<bool>]| masks.iter().map(|m| indices_of(m)).collect();
        Self::from_indices(num_nodes, conv(train), conv(val), conv(test))
    }

    /// Build from node index lists, one per split.
    pub fn from_indices(
        num_nodes: usize,
        train: Vec<Vec<usize>>,
        val: Vec<Vec<usize>>,
        test: Vec<Vec<usize>>,
    ) -> MagNetResult<Self> {
        let splits = train.len();
        if splits == 0 {
            return Err(MagNetError::Dataset("no splits defined".to_string()));
        }
        if val.len() != splits {
            return Err(MagNetError::Dataset(format!(
                "{splits} train masks but {} validation masks",
                val.len()
            )));
        }
        let test = match test.len() {
            1 if splits > 1 => vec![test[0].clone(); splits],
            n if n == splits => test,
            n => {
                return Err(MagNetError::Dataset(format!(
                    "{splits} splits but {n} test masks"
                )))
            }
        };

        let normalize = |mut v: Vec<usize>| {
            v.sort_unstable();
            v.dedup();
            v
        };
        let masks = Self {
            num_nodes,
            train: train.into_iter().map(normalize).collect(),
            val: val.into_iter().map(normalize).collect(),
            test: test.into_iter().map(normalize).collect(),
        };
        masks.validate()?;
        Ok(masks)
    }

    fn validate(&self) -> MagNetResult<()> {
        for s in 0..self.num_splits() {
            let split = self.split(s);
            if split.train.is_empty() {
                return Err(MagNetError::Dataset(format!("split {s}: empty train mask")));
            }
            if split.val.is_empty() {
                return Err(MagNetError::Dataset(format!("split {s}: empty validation mask")));
            }
            let mut owner = vec![None::<&str>; self.num_nodes];
            for (name, set) in [("train", split.train), ("val", split.val), ("test", split.test)] {
                for &i in set {
                    let slot = owner.get_mut(i).ok_or_else(|| {
                        MagNetError::Dataset(format!(
                            "split {s}: {name} index {i} out of range for {} nodes",
                            self.num_nodes
                        ))
                    })?;
                    if let Some(prev) = slot.replace(name) {
                        return Err(MagNetError::Dataset(format!(
                            "split {s}: node {i} is in both {prev} and {name}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn num_splits(&self) -> usize {
        self.train.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Masks of split `s`. Panics if `s >= num_splits()`.
    pub fn split(&self, s: usize) -> SplitIndices<'_> {
        SplitIndices {
            train: &self.train[s],
            val: &self.val[s],
            test: &self.test[s],
        }
    }
}
