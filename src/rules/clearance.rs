use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clearance values are clamped below this bound.
pub const MAX_CLEARANCE: i64 = i32::MAX as i64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClearanceError {
    #[error("clearance class {class} out of range (class count {class_count})")]
    ClassOutOfRange { class: usize, class_count: usize },
    #[error("layer {layer} out of range (layer count {layer_count})")]
    LayerOutOfRange { layer: usize, layer_count: usize },
}

/// Minimum clearances between pairs of clearance classes, per layer.
///
/// The matrix is symmetric: setting `(a, b)` also sets `(b, a)`. Stored values are never
/// negative and always even, so that half a clearance (the compensation applied around a
/// trace's center line) is exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearanceMatrix {
    class_names: Vec<String>,
    layer_count: usize,
    values: Vec<i64>,
    max_values: Vec<i64>,
}

impl ClearanceMatrix {
    pub fn new(class_names: Vec<String>, layer_count: usize) -> Self {
        let class_count = class_names.len();

        Self {
            class_names,
            layer_count,
            values: vec![0; class_count * class_count * layer_count],
            max_values: vec![0; class_count * layer_count],
        }
    }

    /// Two classes, "null" and "default"; "default" against itself gets `default_value` on
    /// every layer.
    pub fn default_instance(layer_count: usize, default_value: i64) -> Self {
        let mut matrix = Self::new(vec!["null".to_string(), "default".to_string()], layer_count);

        for layer in 0..layer_count {
            matrix.store(1, 1, layer, default_value);
        }

        matrix
    }

    pub fn class_count(&self) -> usize {
        self.class_names.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn class_name(&self, class: usize) -> Option<&str> {
        self.class_names.get(class).map(|name| name.as_str())
    }

    pub fn class_no(&self, name: &str) -> Option<usize> {
        self.class_names.iter().position(|class_name| class_name == name)
    }

    /// Appends a class whose clearances against all classes are zero. Returns `false` if a
    /// class with this name already exists.
    pub fn append_class(&mut self, name: &str) -> bool {
        if self.class_no(name).is_some() {
            return false;
        }

        let old_count = self.class_count();
        let new_count = old_count + 1;
        let mut values = vec![0; new_count * new_count * self.layer_count];
        let mut max_values = vec![0; new_count * self.layer_count];

        for a in 0..old_count {
            for b in 0..old_count {
                for layer in 0..self.layer_count {
                    values[(a * new_count + b) * self.layer_count + layer] =
                        self.values[self.index(a, b, layer)];
                }
            }

            for layer in 0..self.layer_count {
                max_values[a * self.layer_count + layer] =
                    self.max_values[a * self.layer_count + layer];
            }
        }

        self.class_names.push(name.to_string());
        self.values = values;
        self.max_values = max_values;
        true
    }

    pub fn set_value(
        &mut self,
        class_1: usize,
        class_2: usize,
        layer: usize,
        value: i64,
    ) -> Result<(), ClearanceError> {
        self.check_class(class_1)?;
        self.check_class(class_2)?;
        self.check_layer(layer)?;

        self.store(class_1, class_2, layer, value);
        Ok(())
    }

    pub fn set_value_on_all_layers(
        &mut self,
        class_1: usize,
        class_2: usize,
        value: i64,
    ) -> Result<(), ClearanceError> {
        for layer in 0..self.layer_count {
            self.set_value(class_1, class_2, layer, value)?;
        }

        Ok(())
    }

    /// Required clearance between the two classes on `layer`.
    ///
    /// # Panics
    ///
    /// Panics if a class or the layer is out of range; see `try_value` for the checked
    /// variant.
    pub fn value(&self, class_1: usize, class_2: usize, layer: usize) -> i64 {
        match self.try_value(class_1, class_2, layer) {
            Ok(value) => value,
            Err(err) => panic!("clearance matrix lookup failed: {}", err),
        }
    }

    pub fn try_value(
        &self,
        class_1: usize,
        class_2: usize,
        layer: usize,
    ) -> Result<i64, ClearanceError> {
        self.check_class(class_1)?;
        self.check_class(class_2)?;
        self.check_layer(layer)?;

        Ok(self.values[self.index(class_1, class_2, layer)])
    }

    /// Largest clearance ever set for `class`, over all partner classes and layers.
    pub fn max_value(&self, class: usize) -> i64 {
        (0..self.layer_count)
            .map(|layer| self.max_value_on_layer(class, layer))
            .max()
            .unwrap_or(0)
    }

    pub fn max_value_on_layer(&self, class: usize, layer: usize) -> i64 {
        self.max_values
            .get(class * self.layer_count + layer)
            .copied()
            .unwrap_or(0)
    }

    /// Half the clearance of `class` against itself, rounded up.
    pub fn clearance_compensation_value(&self, class: usize, layer: usize) -> i64 {
        (self.value(class, class, layer) + 1) / 2
    }

    /// Whether the clearance between the two classes differs between layers.
    pub fn is_layer_dependent(&self, class_1: usize, class_2: usize) -> bool {
        let first = self.value(class_1, class_2, 0);
        (1..self.layer_count).any(|layer| self.value(class_1, class_2, layer) != first)
    }

    /// Recomputes the per-class maxima from the stored values, dropping maxima of values
    /// that have since been lowered.
    pub fn reset_max_values(&mut self) {
        let class_count = self.class_count();

        for a in 0..class_count {
            for layer in 0..self.layer_count {
                self.max_values[a * self.layer_count + layer] = (0..class_count)
                    .map(|b| self.values[self.index(a, b, layer)])
                    .max()
                    .unwrap_or(0);
            }
        }
    }

    fn store(&mut self, class_1: usize, class_2: usize, layer: usize, value: i64) {
        let value = normalize(value);
        let index_12 = self.index(class_1, class_2, layer);
        let index_21 = self.index(class_2, class_1, layer);

        self.values[index_12] = value;
        self.values[index_21] = value;

        for class in [class_1, class_2] {
            let max = &mut self.max_values[class * self.layer_count + layer];
            *max = (*max).max(value);
        }
    }

    fn index(&self, class_1: usize, class_2: usize, layer: usize) -> usize {
        (class_1 * self.class_count() + class_2) * self.layer_count + layer
    }

    fn check_class(&self, class: usize) -> Result<(), ClearanceError> {
        if class >= self.class_count() {
            return Err(ClearanceError::ClassOutOfRange {
                class,
                class_count: self.class_count(),
            });
        }

        Ok(())
    }

    fn check_layer(&self, layer: usize) -> Result<(), ClearanceError> {
        if layer >= self.layer_count {
            return Err(ClearanceError::LayerOutOfRange {
                layer,
                layer_count: self.layer_count,
            });
        }

        Ok(())
    }
}

/// Clamps into `[0, MAX_CLEARANCE - 1]` and rounds odd values up.
fn normalize(value: i64) -> i64 {
    let value = value.clamp(0, MAX_CLEARANCE - 1);

    if value % 2 == 1 {
        value + 1
    } else {
        value
    }
}
