//! The three iteration orderings applied orthogonally to each policy.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Ordering {
    /// Outer loop over jobs (sorted by the policy's primary key); inner
    /// loop finds the best table.
    JobFirst,
    /// Outer loop over tables (in weekday-rotated order); inner loop finds
    /// the best fitting job. Iterates until a full pass makes no progress.
    TableFirst,
    /// Groups jobs by `fixture_id`; processes groups in order of
    /// (has-priority-0 jobs, earliest req_by, largest total panels);
    /// packs a group onto one table when possible so SETUP drops to zero
    /// after the first panel.
    FixtureFirst,
}

impl Ordering {
    pub const ALL: [Ordering; 3] = [Ordering::JobFirst, Ordering::TableFirst, Ordering::FixtureFirst];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ordering::JobFirst => "JobFirst",
            Ordering::TableFirst => "TableFirst",
            Ordering::FixtureFirst => "FixtureFirst",
        }
    }
}

impl std::fmt::Display for Ordering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
