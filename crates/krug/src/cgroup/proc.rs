//! Parsers for the kernel's cgroup proc files.
//!
//! Two line-oriented formats feed the bring-up:
//! - `/proc/cgroups`, the kernel's global subsystem table
//! - `/proc/self/cgroup`, the membership of the invoking process

use std::collections::BTreeMap;
use std::io::BufRead;

use krug_common::{KrugError, KrugResult};

/// Header row of the kernel subsystem table, as whitespace-separated tokens.
const TABLE_HEADER: [&str; 4] = ["#subsys_name", "hierarchy", "num_cgroups", "enabled"];

/// Content recorded in the format error when the table stream has no lines.
const EMPTY_MARKER: &str = "(empty)";

/// One row of the kernel subsystem table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemEntry {
    /// Subsystem (controller) name, e.g. `cpu`.
    pub name: String,
    /// Whether the kernel reports the subsystem as enabled.
    pub enabled: bool,
}

/// Streaming reader over the kernel subsystem table.
///
/// Rows come back in file order; deciding what to do with disabled entries
/// is the caller's business.
#[derive(Debug)]
pub struct SubsystemTable<R> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> SubsystemTable<R> {
    /// Validate the table header and return a reader over the data rows.
    ///
    /// The header must tokenize to exactly
    /// `#subsys_name hierarchy num_cgroups enabled` (the real file is
    /// tab-separated). Anything else, including an empty stream, is a
    /// [`KrugError::CgroupsFormat`] carrying the offending content.
    pub fn parse(reader: R) -> KrugResult<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            None => {
                return Err(KrugError::CgroupsFormat {
                    content: EMPTY_MARKER.to_string(),
                });
            }
            Some(line) => line?,
        };

        if !header.split_whitespace().eq(TABLE_HEADER) {
            return Err(KrugError::CgroupsFormat { content: header });
        }

        Ok(Self { lines })
    }
}

impl<R: BufRead> Iterator for SubsystemTable<R> {
    type Item = KrugResult<SubsystemEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err.into())),
        };
        Some(parse_row(&line))
    }
}

/// A data row is exactly `<name> <hierarchy-id> <num-cgroups> <enabled>`.
///
/// The hierarchy id and cgroup count are unused, but a row where they are
/// not numeric is a malformed table, not a skippable line.
fn parse_row(line: &str) -> KrugResult<SubsystemEntry> {
    let malformed = || KrugError::CgroupsFormat {
        content: line.to_string(),
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [name, hierarchy, num_cgroups, enabled] = fields[..] else {
        return Err(malformed());
    };

    if hierarchy.parse::<u64>().is_err() || num_cgroups.parse::<u64>().is_err() {
        return Err(malformed());
    }
    let enabled = enabled.parse::<u64>().map_err(|_| malformed())? != 0;

    Ok(SubsystemEntry {
        name: name.to_string(),
        enabled,
    })
}

/// Mapping from a subsystem to the joint mount group it belongs to.
///
/// Built from the invoking process's own cgroup membership, so that later
/// mounts recreate the co-mounted hierarchies the host already uses: on a
/// host where `cpu` and `cpuacct` share a hierarchy, mounting either one
/// must use the combined `cpu,cpuacct` option string.
#[derive(Debug, Clone, Default)]
pub struct SubsystemGroupings {
    groups: BTreeMap<String, String>,
}

impl SubsystemGroupings {
    /// Parse `/proc/self/cgroup`-formatted membership data.
    ///
    /// Lines are `hierarchyID:subsystemList:cgroupPath`; lines with any
    /// other field count are ignored, not errors. Stream-read failures
    /// propagate.
    pub fn parse<R: BufRead>(reader: R) -> KrugResult<Self> {
        let mut groups = BTreeMap::new();

        for line in reader.lines() {
            let line = line?;
            let fields: Vec<&str> = line.split(':').collect();
            let [_, subsystems, _] = fields[..] else {
                continue;
            };

            for subsystem in subsystems.split(',') {
                groups.insert(subsystem.to_string(), subsystems.to_string());
            }
        }

        Ok(Self { groups })
    }

    /// The joint option string for a subsystem.
    ///
    /// Falls back to the bare name for subsystems the process is not a
    /// member of, which covers hierarchies mounted singly.
    #[must_use]
    pub fn joint_for<'a>(&'a self, subsystem: &'a str) -> &'a str {
        self.groups
            .get(subsystem)
            .map_or(subsystem, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "#subsys_name\thierarchy\tnum_cgroups\tenabled";

    fn table(input: &str) -> KrugResult<Vec<SubsystemEntry>> {
        SubsystemTable::parse(Cursor::new(input.to_string()))?.collect()
    }

    #[test]
    fn parses_rows_in_file_order() {
        let entries = table(&format!("{HEADER}\ncpuset\t2\t4\t1\ncpu\t3\t4\t1\n")).unwrap();
        assert_eq!(
            entries,
            vec![
                SubsystemEntry {
                    name: "cpuset".to_string(),
                    enabled: true
                },
                SubsystemEntry {
                    name: "cpu".to_string(),
                    enabled: true
                },
            ]
        );
    }

    #[test]
    fn space_separated_rows_parse_too() {
        let entries = table(&format!("{HEADER}\nmemory 0 1 0\n")).unwrap();
        assert_eq!(entries[0].name, "memory");
        assert!(!entries[0].enabled);
    }

    #[test]
    fn empty_stream_is_a_format_error() {
        let err = SubsystemTable::parse(Cursor::new("")).unwrap_err();
        assert!(
            matches!(err, KrugError::CgroupsFormat { ref content } if content == "(empty)"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn header_mismatch_carries_the_line() {
        for bogus in [
            "#subsys_name hierarchy num_cgroups",
            "#subsys_name hierarchy num_cgroups enabled extra",
            "#subsysname hierarchy num_cgroups enabled",
            "",
        ] {
            let err = SubsystemTable::parse(Cursor::new(format!("{bogus}\n"))).unwrap_err();
            assert!(
                matches!(err, KrugError::CgroupsFormat { ref content } if content == bogus),
                "expected format error for {bogus:?}"
            );
        }
    }

    #[test]
    fn malformed_rows_carry_the_line() {
        for bogus in ["cpu 3 4", "cpu 3 4 1 9", "cpu x 4 1", "cpu 3 x 1", "cpu 3 4 on"] {
            let err = table(&format!("{HEADER}\n{bogus}\n")).unwrap_err();
            assert!(
                matches!(err, KrugError::CgroupsFormat { ref content } if content == bogus),
                "expected format error for {bogus:?}"
            );
        }
    }

    #[test]
    fn groupings_map_each_member_to_the_joint_list() {
        let groupings = SubsystemGroupings::parse(Cursor::new(
            "5:memory:/\n4:cpu,cpuacct:/\n3:blkio:/\n",
        ))
        .unwrap();

        assert_eq!(groupings.joint_for("cpu"), "cpu,cpuacct");
        assert_eq!(groupings.joint_for("cpuacct"), "cpu,cpuacct");
        assert_eq!(groupings.joint_for("memory"), "memory");
    }

    #[test]
    fn unknown_subsystem_falls_back_to_its_own_name() {
        let groupings = SubsystemGroupings::parse(Cursor::new("4:cpu,cpuacct:/\n")).unwrap();
        assert_eq!(groupings.joint_for("devices"), "devices");
    }

    #[test]
    fn membership_lines_with_wrong_field_count_are_ignored() {
        let groupings = SubsystemGroupings::parse(Cursor::new(
            "garbage\n4:cpu,cpuacct\n2:freezer:/a:b\n3:blkio:/\n",
        ))
        .unwrap();

        assert_eq!(groupings.joint_for("blkio"), "blkio");
        // The freezer line had four fields and must not have been recorded.
        assert_eq!(groupings.joint_for("freezer"), "freezer");
        assert_eq!(groupings.joint_for("cpu"), "cpu");
    }
}
