// src/algorithms/path.rs

//! The unique-feature path carried down a tree by tree-path-dependent TreeSHAP
//! (Lundberg et al., "Consistent Individualized Feature Attribution for Tree
//! Ensembles", Algorithm 2).

/// One feature on the current root-to-node path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathElement {
    /// `None` only for the sentinel element pushed at the root.
    pub feature: Option<usize>,
    /// Fraction of paths flowing through this branch when the feature is unknown.
    pub zero_fraction: f64,
    /// Fraction of paths flowing through this branch when the feature is known (0 or 1).
    pub one_fraction: f64,
    /// Weight of all subsets of a given size, indexed by position.
    pub pweight: f64,
}

/// Path state. Cheap to clone; each recursive call owns its copy so sibling
/// branches never observe each other's updates.
#[derive(Debug, Clone, Default)]
pub struct UniquePath {
    elements: Vec<PathElement>,
}

impl UniquePath {
    pub fn with_capacity(depth: usize) -> Self {
        UniquePath {
            elements: Vec::with_capacity(depth + 1),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn element(&self, i: usize) -> &PathElement {
        &self.elements[i]
    }

    pub fn position(&self, feature: usize) -> Option<usize> {
        self.elements.iter().position(|e| e.feature == Some(feature))
    }

    /// Grows the path by one feature and updates the subset-size weights.
    pub fn extend(&mut self, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
        let depth = self.elements.len();
        self.elements.push(PathElement {
            feature,
            zero_fraction,
            one_fraction,
            pweight: if depth == 0 { 1.0 } else { 0.0 },
        });
        let denom = (depth + 1) as f64;
        for i in (0..depth).rev() {
            let carried = self.elements[i].pweight;
            self.elements[i + 1].pweight += one_fraction * carried * (i + 1) as f64 / denom;
            self.elements[i].pweight = zero_fraction * carried * (depth - i) as f64 / denom;
        }
    }

    /// Removes the element at `idx`, undoing its effect on the weights.
    pub fn unwind(&mut self, idx: usize) {
        let depth = self.elements.len() - 1;
        let one = self.elements[idx].one_fraction;
        let zero = self.elements[idx].zero_fraction;
        let denom = (depth + 1) as f64;
        let mut next_one_portion = self.elements[depth].pweight;

        for i in (0..depth).rev() {
            if one != 0.0 {
                let tmp = self.elements[i].pweight;
                self.elements[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one);
                next_one_portion =
                    tmp - self.elements[i].pweight * zero * (depth - i) as f64 / denom;
            } else {
                self.elements[i].pweight =
                    self.elements[i].pweight * denom / (zero * (depth - i) as f64);
            }
        }

        // Shift the fractions down; pweights were recomputed above.
        for i in idx..depth {
            self.elements[i].feature = self.elements[i + 1].feature;
            self.elements[i].zero_fraction = self.elements[i + 1].zero_fraction;
            self.elements[i].one_fraction = self.elements[i + 1].one_fraction;
        }
        self.elements.pop();
    }

    /// Total weight the path would carry if the element at `idx` were unwound,
    /// without mutating the path.
    pub fn unwound_sum(&self, idx: usize) -> f64 {
        let depth = self.elements.len() - 1;
        let one = self.elements[idx].one_fraction;
        let zero = self.elements[idx].zero_fraction;
        let denom = (depth + 1) as f64;
        let mut next_one_portion = self.elements[depth].pweight;
        let mut total = 0.0;

        for i in (0..depth).rev() {
            if one != 0.0 {
                let tmp = next_one_portion * denom / ((i + 1) as f64 * one);
                total += tmp;
                next_one_portion =
                    self.elements[i].pweight - tmp * zero * (depth - i) as f64 / denom;
            } else if zero != 0.0 {
                total += self.elements[i].pweight / zero / ((depth - i) as f64 / denom);
            }
        }
        total
    }
}
