// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Metadata tree: groups and parameters.
//!
//! The parameter section of a C3D file is a two-level tree. The root owns
//! groups (nodes without a value); groups own parameters (nodes with a
//! [`Value`]). Labels are unique among siblings.
//!
//! A single parameter cannot hold more than 255 entries in its outermost
//! dimension, so long sequences are spread over `LABEL`, `LABEL2`,
//! `LABEL3`, ... [`MetadataNode::split_and_create_children`] produces that
//! layout and [`MetadataNode::collapse_children_values`] reads it back.

use serde::{Deserialize, Serialize};

use super::error::Result;
use super::value::{Element, Value, ValueData, MAX_DIMENSION_SIZE};

/// Label of the tree root.
pub const ROOT_LABEL: &str = "ROOT";

/// A group or parameter of the metadata tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataNode {
    /// Label, unique among siblings
    pub label: String,
    /// Free-form description
    pub description: String,
    /// Locked flag (negative name length on disk)
    pub locked: bool,
    /// Value; `None` for groups
    pub value: Option<Value>,
    children: Vec<MetadataNode>,
}

impl Default for MetadataNode {
    fn default() -> Self {
        Self::root()
    }
}

impl MetadataNode {
    /// Create an empty tree root.
    pub fn root() -> Self {
        Self::group(ROOT_LABEL, "")
    }

    /// Create a group node.
    pub fn group(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
            locked: false,
            value: None,
            children: Vec::new(),
        }
    }

    /// Create a parameter node.
    pub fn parameter(label: impl Into<String>, value: Value) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            locked: false,
            value: Some(value),
            children: Vec::new(),
        }
    }

    /// Builder-style description setter.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style lock setter.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn is_parameter(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_group(&self) -> bool {
        self.value.is_none()
    }

    pub fn children(&self) -> &[MetadataNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut MetadataNode> {
        self.children.iter_mut()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Append `child` unless a sibling already uses its label.
    ///
    /// Returns `false` (and drops `child`) on a duplicate label.
    pub fn append_child(&mut self, child: MetadataNode) -> bool {
        if self.find_child(&child.label).is_some() {
            return false;
        }
        self.children.push(child);
        true
    }

    /// Direct (non-recursive) lookup among immediate children.
    pub fn find_child(&self, label: &str) -> Option<&MetadataNode> {
        self.children.iter().find(|c| c.label == label)
    }

    pub fn find_child_mut(&mut self, label: &str) -> Option<&mut MetadataNode> {
        self.children.iter_mut().find(|c| c.label == label)
    }

    /// Detach and return the child with `label`.
    pub fn remove_child(&mut self, label: &str) -> Option<MetadataNode> {
        let idx = self.children.iter().position(|c| c.label == label)?;
        Some(self.children.remove(idx))
    }

    /// Value of parameter `name` in group `group`.
    pub fn parameter_value(&self, group: &str, name: &str) -> Option<&Value> {
        self.find_child(group)?.find_child(name)?.value.as_ref()
    }

    /// Lookup by `GROUP:PARAMETER` path (or just `GROUP`).
    pub fn lookup(&self, path: &str) -> Option<&MetadataNode> {
        path.split(':')
            .try_fold(self, |node, label| node.find_child(label))
    }

    /// Return the group child `label`, creating it when missing.
    pub fn ensure_group(&mut self, label: &str, description: &str) -> &mut MetadataNode {
        match self.children.iter().position(|c| c.label == label) {
            Some(idx) => &mut self.children[idx],
            None => {
                self.children.push(MetadataNode::group(label, description));
                let last = self.children.len() - 1;
                &mut self.children[last]
            }
        }
    }

    /// Upsert the child `label` with `value`.
    ///
    /// An existing child has its description cleared, its value replaced
    /// and is unlocked; otherwise a new unlocked child is appended.
    pub fn create_or_replace_child(&mut self, label: &str, value: Value) -> &mut MetadataNode {
        match self.children.iter().position(|c| c.label == label) {
            Some(idx) => {
                let child = &mut self.children[idx];
                child.description.clear();
                child.value = Some(value);
                child.locked = false;
                child
            }
            None => {
                self.children.push(MetadataNode::parameter(label, value));
                let last = self.children.len() - 1;
                &mut self.children[last]
            }
        }
    }

    /// Upsert only when no child `label` exists yet.
    pub fn create_child_if_missing(&mut self, label: &str, value: Value) {
        if self.find_child(label).is_none() {
            self.children.push(MetadataNode::parameter(label, value));
        }
    }

    /// Concatenate the values of `base`, `base2`, `base3`, ...
    ///
    /// Collection stops at the first missing continuation or once
    /// `target_size` elements are gathered. The result is then cut or
    /// padded to `target_size`; string padding gets the element index
    /// (1-based) appended to `blank` so padded labels stay unique.
    pub fn collapse_children_values<T: CollapseElement>(
        &self,
        base: &str,
        target_size: Option<usize>,
        blank: T,
    ) -> Vec<T> {
        let mut out: Vec<T> = Vec::new();
        let mut current = self.find_child(base);
        let mut inc = 2;
        while let Some(node) = current {
            if let Some(value) = &node.value {
                out.extend(T::collect(value));
            }
            if target_size.is_some_and(|t| out.len() >= t) {
                break;
            }
            current = self.find_child(&format!("{base}{inc}"));
            inc += 1;
        }
        if let Some(target) = target_size {
            out.truncate(target);
            let start = out.len();
            out.extend((start..target).map(|i| T::pad(&blank, i)));
        }
        out
    }

    /// Store `values` as `base`, `base2`, ... with at most 255 entries each.
    ///
    /// Continuations left from a previous, longer split are removed.
    pub fn split_and_create_children<T: SplitElement>(
        &mut self,
        base: &str,
        values: &[T],
    ) -> Result<()> {
        self.split_with_shape(base, values, &[])
    }

    /// Like [`split_and_create_children`](Self::split_and_create_children)
    /// for matrices whose inner dimensions are `inner`; the split is along
    /// the outermost dimension.
    pub fn split_and_create_children_2d<T: SplitElement>(
        &mut self,
        base: &str,
        values: &[T],
        inner: usize,
    ) -> Result<()> {
        self.split_with_shape(base, values, &[inner.max(1)])
    }

    fn split_with_shape<T: SplitElement>(
        &mut self,
        base: &str,
        values: &[T],
        inner: &[usize],
    ) -> Result<()> {
        let stride: usize = inner.iter().product();
        let per_entry = MAX_DIMENSION_SIZE * stride;
        let mut written = 0;
        let mut index = 1;
        loop {
            let end = (written + per_entry).min(values.len());
            let chunk = &values[written..end];
            let mut shape = inner.to_vec();
            shape.push(chunk.len() / stride);
            let label = continuation_label(base, index);
            self.create_or_replace_child(&label, T::make_value(chunk, &shape)?);
            written = end;
            index += 1;
            if written >= values.len() {
                break;
            }
        }
        while self.remove_child(&continuation_label(base, index)).is_some() {
            index += 1;
        }
        Ok(())
    }
}

/// Label of the `index`-th (1-based) entry of a split sequence.
pub(crate) fn continuation_label(base: &str, index: usize) -> String {
    if index == 1 {
        base.to_string()
    } else {
        format!("{base}{index}")
    }
}

/// Element type that can be gathered by
/// [`MetadataNode::collapse_children_values`].
pub trait CollapseElement: Sized {
    /// Elements of `value` viewed as `Self`.
    fn collect(value: &Value) -> Vec<Self>;
    /// Padding element for position `index`.
    fn pad(blank: &Self, index: usize) -> Self;
}

impl CollapseElement for String {
    fn collect(value: &Value) -> Vec<Self> {
        value.to_strings()
    }

    fn pad(blank: &Self, index: usize) -> Self {
        format!("{blank}{}", index + 1)
    }
}

macro_rules! impl_collapse_numeric {
    ($($t:ty),*) => {
        $(
            impl CollapseElement for $t {
                fn collect(value: &Value) -> Vec<Self> {
                    value.cast()
                }

                fn pad(blank: &Self, _index: usize) -> Self {
                    *blank
                }
            }
        )*
    };
}

impl_collapse_numeric!(i8, i16, i32, i64, u16, u32, usize, f32, f64);

/// Element type that can be stored by
/// [`MetadataNode::split_and_create_children`].
pub trait SplitElement: Clone {
    /// Build a value holding `chunk` with dimensions `shape`.
    fn make_value(chunk: &[Self], shape: &[usize]) -> Result<Value>;
}

impl SplitElement for String {
    fn make_value(chunk: &[Self], shape: &[usize]) -> Result<Value> {
        Value::string_matrix(chunk.iter().cloned(), shape)
    }
}

impl SplitElement for i8 {
    fn make_value(chunk: &[Self], shape: &[usize]) -> Result<Value> {
        Value::with_dims(shape.to_vec(), ValueData::Int8(chunk.to_vec()))
    }
}

impl SplitElement for i16 {
    fn make_value(chunk: &[Self], shape: &[usize]) -> Result<Value> {
        Value::with_dims(shape.to_vec(), ValueData::Int16(chunk.to_vec()))
    }
}

impl SplitElement for f32 {
    fn make_value(chunk: &[Self], shape: &[usize]) -> Result<Value> {
        Value::with_dims(shape.to_vec(), ValueData::Float32(chunk.to_vec()))
    }
}

/// Helpers shared by code that needs a numeric view with a fallback.
pub(crate) fn first_or<T: Element>(value: Option<&Value>, default: T) -> T {
    value.and_then(|v| v.first()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("M{i}")).collect()
    }

    #[test]
    fn test_append_rejects_duplicate() {
        let mut root = MetadataNode::root();
        assert!(root.append_child(MetadataNode::group("POINT", "")));
        assert!(!root.append_child(MetadataNode::group("POINT", "other")));
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_find_child_is_not_recursive() {
        let mut root = MetadataNode::root();
        let point = root.ensure_group("POINT", "");
        point.create_or_replace_child("USED", Value::int16(3));
        assert!(root.find_child("USED").is_none());
        assert!(root.lookup("POINT:USED").is_some());
        assert_eq!(
            root.parameter_value("POINT", "USED").and_then(|v| v.first::<i32>()),
            Some(3)
        );
    }

    #[test]
    fn test_create_or_replace_resets_child() {
        let mut group = MetadataNode::group("POINT", "");
        group.append_child(
            MetadataNode::parameter("SCALE", Value::float(0.1))
                .with_description("scale")
                .with_locked(true),
        );
        group.create_or_replace_child("SCALE", Value::float(-0.2));
        let scale = group.find_child("SCALE").unwrap();
        assert!(scale.description.is_empty());
        assert!(!scale.locked);
        assert_eq!(scale.value, Some(Value::float(-0.2)));
        assert_eq!(group.children().len(), 1);
    }

    #[test]
    fn test_collapse_pads_strings_with_index() {
        let mut group = MetadataNode::group("POINT", "");
        group.create_or_replace_child("LABELS", Value::strings(["A", "B"]));
        let out = group.collapse_children_values("LABELS", Some(4), "uname*".to_string());
        assert_eq!(out, vec!["A", "B", "uname*3", "uname*4"]);
    }

    #[test]
    fn test_collapse_missing_base() {
        let group = MetadataNode::group("ANALOG", "");
        let out = group.collapse_children_values("SCALE", Some(2), 1.0f64);
        assert_eq!(out, vec![1.0, 1.0]);
        let out: Vec<f64> = group.collapse_children_values("SCALE", None, 1.0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_collapse_stops_at_target() {
        let mut group = MetadataNode::group("ANALOG", "");
        group.create_or_replace_child("OFFSET", Value::int16s(vec![1, 2, 3]));
        group.create_or_replace_child("OFFSET2", Value::int16s(vec![4, 5]));
        assert_eq!(
            group.collapse_children_values("OFFSET", Some(2), 0i32),
            vec![1, 2]
        );
        assert_eq!(
            group.collapse_children_values("OFFSET", None, 0i32),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_split_then_collapse_reconstructs() {
        let values = labels(600);
        let mut group = MetadataNode::group("POINT", "");
        group.split_and_create_children("LABELS", &values).unwrap();
        assert!(group.find_child("LABELS").is_some());
        assert!(group.find_child("LABELS2").is_some());
        assert!(group.find_child("LABELS3").is_some());
        assert!(group.find_child("LABELS4").is_none());
        assert_eq!(
            group
                .find_child("LABELS3")
                .and_then(|n| n.value.as_ref())
                .map(Value::len),
            Some(90)
        );
        let back = group.collapse_children_values("LABELS", Some(600), String::new());
        assert_eq!(back, values);
    }

    #[test]
    fn test_split_boundary_255_stays_single() {
        let mut group = MetadataNode::group("POINT", "");
        group.split_and_create_children("LABELS", &labels(255)).unwrap();
        assert!(group.find_child("LABELS2").is_none());
        group.split_and_create_children("LABELS", &labels(256)).unwrap();
        assert!(group.find_child("LABELS2").is_some());
    }

    #[test]
    fn test_split_removes_stale_continuations() {
        let mut group = MetadataNode::group("POINT", "");
        group.split_and_create_children("LABELS", &labels(520)).unwrap();
        assert!(group.find_child("LABELS3").is_some());
        group.split_and_create_children("LABELS", &labels(3)).unwrap();
        assert!(group.find_child("LABELS2").is_none());
        assert!(group.find_child("LABELS3").is_none());
    }

    #[test]
    fn test_split_empty_creates_zero_sized_value() {
        let mut group = MetadataNode::group("ANALOG", "");
        group.split_and_create_children::<f32>("SCALE", &[]).unwrap();
        let value = group.find_child("SCALE").and_then(|n| n.value.as_ref()).unwrap();
        assert!(value.is_empty());
        assert_eq!(value.dims(), &[0]);
    }

    #[test]
    fn test_split_2d_keeps_inner_dimension() {
        let times: Vec<f32> = (0..600).map(|i| i as f32).collect();
        let mut group = MetadataNode::group("EVENT", "");
        group.split_and_create_children_2d("TIMES", &times, 2).unwrap();
        let first = group.find_child("TIMES").and_then(|n| n.value.as_ref()).unwrap();
        assert_eq!(first.dims(), &[2, 255]);
        let second = group.find_child("TIMES2").and_then(|n| n.value.as_ref()).unwrap();
        assert_eq!(second.dims(), &[2, 45]);
        let back: Vec<f32> = group.collapse_children_values("TIMES", None, 0.0);
        assert_eq!(back, times);
    }
}
