//! Structural merging of part-of references and series memberships.

use crate::record::{IdentifierKind, PartOf, Record, Series};

/// Union the record-level series memberships.
pub(crate) fn merge_series(master: &mut Record, candidate: &Record) {
    for series in &candidate.series {
        if !master.series.iter().any(|m| m.same_series(series)) {
            master.series.push(series.clone());
        }
    }
}

/// Merge part-of references by structural equality: on a match the ISSN and
/// ISBN lists are unioned (filling missing qualifiers from the candidate)
/// and nested series are merged recursively; otherwise the candidate's
/// reference is appended.
pub(crate) fn merge_part_of(master: &mut Record, candidate: &Record) {
    for part_of in &candidate.part_of {
        if let Some(existing) = master.part_of.iter_mut().find(|m| m.matches(part_of)) {
            fill_identifiers(existing, part_of, IdentifierKind::Issn);
            fill_identifiers(existing, part_of, IdentifierKind::Isbn);
            merge_nested_series(&mut existing.series, &part_of.series);
        } else {
            master.part_of.push(part_of.clone());
        }
    }
}

fn fill_identifiers(master: &mut PartOf, candidate: &PartOf, kind: IdentifierKind) {
    for incoming in candidate.identifiers.iter().filter(|i| i.kind == kind) {
        match master
            .identifiers
            .iter_mut()
            .find(|m| m.kind == kind && m.value == incoming.value)
        {
            Some(existing) => {
                if existing.qualifier.is_none() && incoming.qualifier.is_some() {
                    existing.qualifier = incoming.qualifier.clone();
                }
            }
            None => master.identifiers.push(incoming.clone()),
        }
    }
}

fn merge_nested_series(master: &mut Vec<Series>, candidate: &[Series]) {
    for series in candidate {
        if !master.iter().any(|m| m.same_series_in_part_of(series)) {
            master.push(series.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Identifier;
    use pretty_assertions::assert_eq;

    fn journal_issue(volume: &str, issue: &str) -> PartOf {
        PartOf {
            main_title: Some("Journal of Example Studies".into()),
            volume: Some(volume.into()),
            issue: Some(issue.into()),
            ..Default::default()
        }
    }

    fn record_with_part_of(part_of: Vec<PartOf>) -> Record {
        Record {
            part_of,
            ..Default::default()
        }
    }

    #[test]
    fn test_distinct_part_of_is_appended() {
        let mut master = record_with_part_of(vec![journal_issue("14", "1")]);
        let candidate = record_with_part_of(vec![journal_issue("14", "2")]);
        merge_part_of(&mut master, &candidate);
        assert_eq!(master.part_of.len(), 2);
    }

    #[test]
    fn test_equal_part_of_unions_identifiers_and_qualifiers() {
        let mut with_qualifier = Identifier::new(IdentifierKind::Issn, "1234-5678");
        with_qualifier.qualifier = Some("print".into());

        let mut master_entry = journal_issue("14", "1");
        master_entry
            .identifiers
            .push(Identifier::new(IdentifierKind::Issn, "1234-5678"));
        let mut candidate_entry = journal_issue("14", "1");
        candidate_entry.identifiers.push(with_qualifier);
        candidate_entry
            .identifiers
            .push(Identifier::new(IdentifierKind::Issn, "8765-4321"));

        let mut master = record_with_part_of(vec![master_entry]);
        let candidate = record_with_part_of(vec![candidate_entry]);
        merge_part_of(&mut master, &candidate);

        assert_eq!(master.part_of.len(), 1);
        let identifiers = &master.part_of[0].identifiers;
        assert_eq!(identifiers.len(), 2);
        assert_eq!(identifiers[0].qualifier.as_deref(), Some("print"));
    }

    #[test]
    fn test_nested_series_merge_recursively() {
        let mut master_entry = journal_issue("14", "1");
        master_entry.series.push(Series {
            title: Some("Example Series".into()),
            issn: Some("1111-2222".into()),
            issue_number: None,
        });
        let mut candidate_entry = journal_issue("14", "1");
        // same series, recognized by ISSN alone under a part-of
        candidate_entry.series.push(Series {
            title: None,
            issn: Some("1111-2222".into()),
            issue_number: Some("7".into()),
        });
        candidate_entry.series.push(Series::titled("Another Series"));

        let mut master = record_with_part_of(vec![master_entry]);
        let candidate = record_with_part_of(vec![candidate_entry]);
        merge_part_of(&mut master, &candidate);
        assert_eq!(master.part_of[0].series.len(), 2);
    }

    #[test]
    fn test_record_level_series_union() {
        let mut master = Record {
            series: vec![Series {
                title: Some("Example Series".into()),
                issn: Some("1111-2222".into()),
                issue_number: Some("7".into()),
            }],
            ..Default::default()
        };
        let candidate = Record {
            series: vec![
                Series {
                    title: Some("Example series".into()),
                    issn: None,
                    issue_number: None,
                },
                Series::titled("A Different Series"),
            ],
            ..Default::default()
        };
        merge_series(&mut master, &candidate);
        assert_eq!(master.series.len(), 2);
    }
}
