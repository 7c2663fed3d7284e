use indexmap::IndexMap;
use quill_core::{Decimal, Node};
use serde::{Deserialize, Serialize};

/// Name of the implicit extern that records this contract's own functions.
pub const SELF_EXTERN: &str = "self";

/// Placement of one storage path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVariable {
    /// Offset within the enclosing frame (the parent tuple, or the contract).
    pub offset: Decimal,
    /// Stride multipliers, innermost dimension first. The last entry is the
    /// total footprint of the declaration.
    pub coefficients: Vec<Decimal>,
    /// Position of the declaration within its frame.
    pub index: usize,
    /// Set for tuples: the path names a group, not a terminal value.
    pub non_final: bool,
}

impl StorageVariable {
    pub fn footprint(&self) -> Decimal {
        self.coefficients.last().cloned().unwrap_or_default()
    }

    pub fn dimensions(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageVariableTable {
    variables: IndexMap<String, StorageVariable>,
    /// Cursor of the top-level frame: where the next `data` declaration lands.
    global_offset: Decimal,
}

impl StorageVariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&StorageVariable> {
        self.variables.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.variables.contains_key(path)
    }

    pub fn insert(&mut self, path: String, variable: StorageVariable) {
        self.variables.insert(path, variable);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StorageVariable)> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn global_offset(&self) -> &Decimal {
        &self.global_offset
    }

    pub(crate) fn set_global_offset(&mut self, offset: Decimal) {
        self.global_offset = offset;
    }

    /// Offset of `path` from the start of storage, summing the offsets of
    /// every enclosing tuple. Tuples are assumed to be addressed at element 0.
    pub fn absolute_offset(&self, path: &str) -> Option<Decimal> {
        let mut total = Decimal::zero();
        let mut prefix = String::new();
        for segment in path.split('.') {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            total = total.add(&self.get(&prefix)?.offset);
        }
        Some(total)
    }

    /// `absolute_offset + Σ index·coefficient`, with `indices` given in
    /// source order (outermost dimension first).
    pub fn element_address(&self, path: &str, indices: &[Decimal]) -> Option<Decimal> {
        let variable = self.get(path)?;
        if indices.len() != variable.dimensions() {
            return None;
        }
        let strides = variable.coefficients[..indices.len()].iter().rev();
        indices
            .iter()
            .zip(strides)
            .try_fold(self.absolute_offset(path)?, |acc, (index, stride)| {
                Some(acc.add(&index.mul(stride)))
            })
    }
}

/// Dispatch indices and argument signatures of declared interfaces.
///
/// The flattened `global_*` maps ignore which extern a member came from, so
/// a later member with the same name replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternTable {
    pub local_externs: IndexMap<String, IndexMap<String, usize>>,
    pub local_extern_sigs: IndexMap<String, IndexMap<String, String>>,
    pub global_externs: IndexMap<String, usize>,
    pub global_extern_sigs: IndexMap<String, String>,
}

impl ExternTable {
    pub fn new() -> Self {
        let mut local_externs = IndexMap::new();
        local_externs.insert(SELF_EXTERN.to_string(), IndexMap::new());
        Self {
            local_externs,
            local_extern_sigs: IndexMap::new(),
            global_externs: IndexMap::new(),
            global_extern_sigs: IndexMap::new(),
        }
    }

    /// Records a lowered function under `self`. Returns the index it replaced.
    pub fn register_function(&mut self, name: &str, index: usize) -> Option<usize> {
        self.local_externs
            .entry(SELF_EXTERN.to_string())
            .or_default()
            .insert(name.to_string(), index)
    }

    pub fn declare_extern(&mut self, extern_name: &str) {
        self.local_externs
            .entry(extern_name.to_string())
            .or_default();
    }

    /// Records one member of an extern. Returns true when the flattened
    /// tables already held a member of that name.
    pub fn register_member(
        &mut self,
        extern_name: &str,
        member: &str,
        index: usize,
        signature: &str,
    ) -> bool {
        let collided = self
            .global_externs
            .insert(member.to_string(), index)
            .is_some();
        self.global_extern_sigs
            .insert(member.to_string(), signature.to_string());
        self.local_externs
            .entry(extern_name.to_string())
            .or_default()
            .insert(member.to_string(), index);
        self.local_extern_sigs
            .entry(extern_name.to_string())
            .or_default()
            .insert(member.to_string(), signature.to_string());
        collided
    }

    pub fn dispatch_index(&self, extern_name: &str, member: &str) -> Option<usize> {
        self.local_externs.get(extern_name)?.get(member).copied()
    }

    /// An empty signature means an unbounded tail of integers.
    pub fn signature(&self, extern_name: &str, member: &str) -> Option<&str> {
        self.local_extern_sigs
            .get(extern_name)?
            .get(member)
            .map(String::as_str)
    }

    pub fn global_index(&self, member: &str) -> Option<usize> {
        self.global_externs.get(member).copied()
    }

    pub fn global_signature(&self, member: &str) -> Option<&str> {
        self.global_extern_sigs.get(member).map(String::as_str)
    }

    pub fn functions(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.local_externs
            .get(SELF_EXTERN)
            .into_iter()
            .flat_map(|members| members.iter())
    }
}

impl Default for ExternTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the preprocessor hands to the later stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessResult {
    pub program: Node,
    pub externs: ExternTable,
    pub storage: StorageVariableTable,
}
