//! Grouping of documents into discussion units.
//!
//! A report walks through its documents one group at a time. Documents that
//! mention the same place belong together (transitively: A shares a place with
//! B, B with C, so A, B and C form one group). Groups are ordered by their
//! earliest known record date so the narration moves forward in time.

use std::collections::HashMap;

use crate::models::DocumentBrief;
use crate::services::dates::NormalizedDate;

/// Documents discussed together in one content turn.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentGroup {
    /// Places shared by more than one member, in first-seen spelling.
    pub places: Vec<String>,
    pub documents: Vec<DocumentBrief>,
}

impl DocumentGroup {
    /// Earliest normalized record date among the members.
    pub fn earliest_date(&self) -> Option<NormalizedDate> {
        self.documents
            .iter()
            .filter_map(DocumentBrief::normalized_date)
            .min()
    }
}

fn place_key(place: &str) -> String {
    place
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // Keep the earlier document as root so group order follows input order
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

/// Partition documents into groups linked by shared place names.
pub fn group_documents(documents: &[DocumentBrief]) -> Vec<DocumentGroup> {
    let mut parent: Vec<usize> = (0..documents.len()).collect();
    let mut first_holder: HashMap<String, usize> = HashMap::new();
    let mut holders: HashMap<String, usize> = HashMap::new();
    let mut spelling: HashMap<String, String> = HashMap::new();

    for (idx, doc) in documents.iter().enumerate() {
        let mut seen_here = Vec::new();
        for place in &doc.places {
            let key = place_key(place);
            if key.is_empty() || seen_here.contains(&key) {
                continue;
            }
            seen_here.push(key.clone());
            spelling
                .entry(key.clone())
                .or_insert_with(|| place.trim().to_string());
            *holders.entry(key.clone()).or_insert(0) += 1;
            match first_holder.get(&key) {
                Some(&other) => union(&mut parent, idx, other),
                None => {
                    first_holder.insert(key, idx);
                }
            }
        }
    }

    let mut root_to_group: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<DocumentGroup> = Vec::new();

    for (idx, doc) in documents.iter().enumerate() {
        let root = find(&mut parent, idx);
        let group_idx = *root_to_group.entry(root).or_insert_with(|| {
            groups.push(DocumentGroup {
                places: Vec::new(),
                documents: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[group_idx];
        for place in &doc.places {
            let key = place_key(place);
            if holders.get(&key).copied().unwrap_or(0) < 2 {
                continue;
            }
            if let Some(name) = spelling.get(&key) {
                if !group.places.contains(name) {
                    group.places.push(name.clone());
                }
            }
        }
        group.documents.push(doc.clone());
    }

    // Stable sort keeps first-appearance order among equal or undated groups
    groups.sort_by(|a, b| match (a.earliest_date(), b.earliest_date()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, date: Option<&str>, places: &[&str]) -> DocumentBrief {
        DocumentBrief {
            id: id.to_string(),
            date: date.map(str::to_string),
            places: places.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn ids(group: &DocumentGroup) -> Vec<&str> {
        group.documents.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_shared_place_links_documents() {
        let docs = vec![
            doc("a", None, &["Dallas", "Fort Worth"]),
            doc("b", None, &["dallas "]),
            doc("c", None, &["Moscow"]),
        ];
        let groups = group_documents(&docs);
        assert_eq!(groups.len(), 2);
        assert_eq!(ids(&groups[0]), vec!["a", "b"]);
        assert_eq!(groups[0].places, vec!["Dallas"]);
        assert_eq!(ids(&groups[1]), vec!["c"]);
        assert!(groups[1].places.is_empty());
    }

    #[test]
    fn test_links_are_transitive() {
        let docs = vec![
            doc("a", None, &["Mexico City"]),
            doc("b", None, &["New Orleans"]),
            doc("c", None, &["Mexico City", "New Orleans"]),
        ];
        let groups = group_documents(&docs);
        assert_eq!(groups.len(), 1);
        assert_eq!(ids(&groups[0]), vec!["a", "b", "c"]);
        assert_eq!(groups[0].places, vec!["Mexico City", "New Orleans"]);
    }

    #[test]
    fn test_documents_without_places_stand_alone() {
        let docs = vec![doc("a", None, &[]), doc("b", None, &[])];
        let groups = group_documents(&docs);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_groups_ordered_chronologically() {
        let docs = vec![
            doc("late", Some("June 5, 1968"), &["Los Angeles"]),
            doc("undated", None, &["Langley"]),
            doc("early", Some("11/22/63"), &["Dallas"]),
        ];
        let groups = group_documents(&docs);
        let order: Vec<&str> = groups.iter().map(|g| g.documents[0].id.as_str()).collect();
        assert_eq!(order, vec!["early", "late", "undated"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_documents(&[]).is_empty());
    }
}
