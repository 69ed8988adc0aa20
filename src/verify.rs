use crate::parsers::{BundleSummary, ConceptEntry};

/// Check that a bundle read back from disk has the shape the generator emits.
/// Returns one message per problem found; an empty list means the bundle is
/// consistent.
pub fn check_bundle(summary: &BundleSummary) -> Vec<String> {
    let mut problems = Vec::new();

    if summary.resource_type.as_deref() != Some("Bundle") {
        problems.push(format!(
            "resourceType is {:?}, expected \"Bundle\"",
            summary.resource_type
        ));
    }
    if summary.bundle_type.as_deref() != Some("transaction") {
        problems.push(format!(
            "Bundle type is {:?}, expected \"transaction\"",
            summary.bundle_type
        ));
    }
    if summary.entry_count != 2 {
        problems.push(format!(
            "Bundle has {} entries, expected 2",
            summary.entry_count
        ));
    }

    let (cs, vs) = match (&summary.code_system, &summary.value_set) {
        (Some(cs), Some(vs)) => (cs, vs),
        (cs, vs) => {
            if cs.is_none() {
                problems.push("CodeSystem resource missing".to_string());
            }
            if vs.is_none() {
                problems.push("ValueSet resource missing".to_string());
            }
            return problems;
        }
    };

    if cs.count != Some(cs.concepts.len() as u64) {
        problems.push(format!(
            "CodeSystem count is {:?} but it has {} concepts",
            cs.count,
            cs.concepts.len()
        ));
    }

    for (i, concept) in cs.concepts.iter().enumerate() {
        if !definition_matches(concept) {
            problems.push(format!(
                "CodeSystem concept #{} ({}) has definition {:?} not ending in its display",
                i, concept.code, concept.definition
            ));
        }
    }

    if vs.includes.len() != 1 {
        problems.push(format!(
            "ValueSet has {} include blocks, expected 1",
            vs.includes.len()
        ));
        return problems;
    }

    let include = &vs.includes[0];
    if include.system != cs.url {
        problems.push(format!(
            "ValueSet include system {:?} does not match CodeSystem url {:?}",
            include.system, cs.url
        ));
    }

    if include.concepts.len() != cs.concepts.len() {
        problems.push(format!(
            "ValueSet lists {} concepts, CodeSystem has {}",
            include.concepts.len(),
            cs.concepts.len()
        ));
    }

    for (i, (vs_concept, cs_concept)) in include.concepts.iter().zip(&cs.concepts).enumerate() {
        if vs_concept.code != cs_concept.code || vs_concept.display != cs_concept.display {
            problems.push(format!(
                "Concept #{} differs: ValueSet ({}, {:?}) vs CodeSystem ({}, {:?})",
                i, vs_concept.code, vs_concept.display, cs_concept.code, cs_concept.display
            ));
        }
        if vs_concept.definition.is_some() {
            problems.push(format!(
                "ValueSet concept #{} ({}) carries a definition",
                i, vs_concept.code
            ));
        }
    }

    problems
}

/// `definition` must be `"<non-empty prefix>: <display>"`
fn definition_matches(concept: &ConceptEntry) -> bool {
    match (&concept.definition, &concept.display) {
        (Some(definition), Some(display)) => definition
            .strip_suffix(display.as_str())
            .and_then(|rest| rest.strip_suffix(": "))
            .map(|prefix| !prefix.is_empty())
            .unwrap_or(false),
        _ => false,
    }
}
