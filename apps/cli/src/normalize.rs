//! Pure transformation of remote payloads into store row shapes.
//!
//! No I/O happens here: raw page items come in, a `NormalizedBatch` of
//! typed rows comes out, and the store persists the whole batch in one
//! transaction.

use crate::api::types::{AssignmentData, Resource, SubjectData};
use serde_json::Value;
use thiserror::Error;
use torii_core::types::{Assignment, Meaning, Reading, Subject, SubjectKind};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown subject kind: {0}")]
    UnknownKind(String),
}

/// Row tuples for one sync batch.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub subjects: Vec<Subject>,
    /// (subject_id, meaning)
    pub meanings: Vec<(i64, Meaning)>,
    /// (subject_id, reading)
    pub readings: Vec<(i64, Reading)>,
    /// (id_component, id_product) composition edges
    pub components: Vec<(i64, i64)>,
    pub assignments: Vec<Assignment>,
}

/// Normalize raw subject and assignment page items into one batch.
pub fn batch(
    subject_items: &[Value],
    assignment_items: &[Value],
) -> Result<NormalizedBatch, NormalizeError> {
    let mut out = NormalizedBatch::default();
    for item in subject_items {
        push_subject(&mut out, item)?;
    }
    for item in assignment_items {
        push_assignment(&mut out, item)?;
    }
    Ok(out)
}

fn push_subject(out: &mut NormalizedBatch, item: &Value) -> Result<(), NormalizeError> {
    let resource: Resource<SubjectData> = serde_json::from_value(item.clone())?;
    let kind = SubjectKind::from_str(&resource.object)
        .ok_or_else(|| NormalizeError::UnknownKind(resource.object.clone()))?;
    let data = resource.data;
    let id = resource.id;

    out.subjects.push(Subject {
        id,
        kind,
        characters: data.characters,
        slug: data.slug,
        level: data.level,
        url: data.document_url,
        meaning_mnemonic: data.meaning_mnemonic,
        reading_mnemonic: data.reading_mnemonic,
        hidden_at: data.hidden_at,
    });

    for m in data.meanings {
        out.meanings.push((
            id,
            Meaning {
                text: m.meaning,
                primary: m.primary,
                accepted: m.accepted_answer,
            },
        ));
    }

    // Readings exist only for kanji and vocabulary.
    if kind.has_reading_task() {
        for r in data.readings {
            out.readings.push((
                id,
                Reading {
                    text: r.reading,
                    primary: r.primary,
                    accepted: r.accepted_answer,
                    kind: r.kind,
                },
            ));
        }
    }

    // Composition edges are derived from the kanji side only: radicals
    // compose the kanji, the kanji composes vocabulary.
    if kind == SubjectKind::Kanji {
        for radical in data.component_subject_ids {
            out.components.push((radical, id));
        }
        for vocabulary in data.amalgamation_subject_ids {
            out.components.push((id, vocabulary));
        }
    }

    Ok(())
}

fn push_assignment(out: &mut NormalizedBatch, item: &Value) -> Result<(), NormalizeError> {
    let resource: Resource<AssignmentData> = serde_json::from_value(item.clone())?;
    let data = resource.data;
    out.assignments.push(Assignment {
        id: resource.id,
        subject_id: data.subject_id,
        srs_stage: data.srs_stage,
        hidden: data.hidden,
        available_at: data.available_at,
        started_at: data.started_at,
        unlocked_at: data.unlocked_at,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kanji_item() -> Value {
        json!({
            "id": 440,
            "object": "kanji",
            "data": {
                "characters": "人",
                "level": 1,
                "slug": "人",
                "document_url": "https://example.com/kanji/人",
                "meaning_mnemonic": "...",
                "reading_mnemonic": "...",
                "hidden_at": null,
                "meanings": [
                    { "meaning": "Person", "primary": true, "accepted_answer": true }
                ],
                "readings": [
                    { "meaning": null, "reading": "じん", "primary": true, "accepted_answer": true, "type": "onyomi" },
                    { "reading": "にん", "primary": false, "accepted_answer": true, "type": "onyomi" }
                ],
                "component_subject_ids": [9],
                "amalgamation_subject_ids": [2467, 2468]
            }
        })
    }

    fn radical_item() -> Value {
        json!({
            "id": 9,
            "object": "radical",
            "data": {
                "characters": null,
                "level": 1,
                "slug": "person",
                "document_url": "https://example.com/radicals/person",
                "meaning_mnemonic": "...",
                "meanings": [
                    { "meaning": "Person", "primary": true, "accepted_answer": true }
                ],
                "amalgamation_subject_ids": [440]
            }
        })
    }

    fn assignment_item() -> Value {
        json!({
            "id": 80463006,
            "object": "assignment",
            "data": {
                "subject_id": 440,
                "srs_stage": 2,
                "hidden": false,
                "available_at": "2026-02-01T00:00:00.000000Z",
                "started_at": "2026-01-01T00:00:00.000000Z",
                "unlocked_at": "2025-12-20T00:00:00.000000Z"
            }
        })
    }

    #[test]
    fn kanji_yields_rows_and_both_edge_directions() {
        let out = batch(&[kanji_item()], &[]).unwrap();
        assert_eq!(out.subjects.len(), 1);
        assert_eq!(out.subjects[0].kind, SubjectKind::Kanji);
        assert_eq!(out.meanings.len(), 1);
        assert_eq!(out.readings.len(), 2);
        assert_eq!(out.components, vec![(9, 440), (440, 2467), (440, 2468)]);
    }

    #[test]
    fn radical_yields_no_readings_and_no_edges() {
        let out = batch(&[radical_item()], &[]).unwrap();
        assert_eq!(out.subjects[0].characters, None);
        assert_eq!(out.subjects[0].slug, "person");
        assert!(out.readings.is_empty());
        // Edges come from the kanji side only; the radical's own
        // amalgamation list is redundant and skipped.
        assert!(out.components.is_empty());
    }

    #[test]
    fn assignment_fields_carry_over() {
        let out = batch(&[], &[assignment_item()]).unwrap();
        let a = &out.assignments[0];
        assert_eq!(a.id, 80463006);
        assert_eq!(a.subject_id, 440);
        assert_eq!(a.srs_stage, 2);
        assert!(!a.hidden);
        assert!(a.started_at.is_some());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let mut item = kanji_item();
        item["object"] = json!("grammar_point");
        assert!(matches!(
            batch(&[item], &[]),
            Err(NormalizeError::UnknownKind(_))
        ));
    }
}
