use std::collections::HashMap;

use crate::error::{MeshError, Result};

use super::{NeighborSlot, Panel};

/// Links panels sharing an edge through the slot each panel assigns to that
/// edge. Trailing edges and edges shared by more than two panels stay free.
pub fn link_neighbors(panels: &mut [Panel]) {
    let mut edges: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for (p, panel) in panels.iter().enumerate() {
        for k in 0..panel.shape.vertex_count() {
            if panel.trailing_edge == Some(k) {
                continue;
            }
            let (a, b) = panel.edge(k);
            edges.entry((a.min(b), a.max(b))).or_default().push((p, k));
        }
    }

    for panel in panels.iter_mut() {
        panel.neighbors = [None; 4];
    }
    for sharing in edges.values() {
        let &[(p, kp), (q, kq)] = sharing.as_slice() else {
            continue;
        };
        let slot_p = panels[p].edge_slots[kp];
        let slot_q = panels[q].edge_slots[kq];
        panels[p].neighbors[slot_p.index()] = Some(q);
        panels[q].neighbors[slot_q.index()] = Some(p);
    }
}

/// Verifies that every neighbour slot is either free or a mutual
/// back-reference.
///
/// # Errors
///
/// Returns [`MeshError::ConnectivityMismatch`] for the first one-sided slot,
/// or [`MeshError::IndexOutOfRange`] for a slot pointing past the array.
pub fn check_connectivity(panels: &[Panel]) -> Result<()> {
    for (p, panel) in panels.iter().enumerate() {
        for slot in NeighborSlot::ALL {
            let Some(q) = panel.neighbor(slot) else {
                continue;
            };
            let Some(other) = panels.get(q) else {
                return Err(MeshError::IndexOutOfRange {
                    what: "panel array",
                    index: q,
                    len: panels.len(),
                }
                .into());
            };
            // The link must sit in the slot both panels assign to their shared edge.
            let mutual = shared_edge(panel, other).is_some_and(|(k, kq)| {
                panel.edge_slots[k] == slot && other.neighbor(other.edge_slots[kq]) == Some(p)
            });
            if !mutual {
                return Err(MeshError::ConnectivityMismatch {
                    panel: p,
                    slot: slot.name(),
                    neighbour: q,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Local edge indices `(k, kq)` through which `panel` and `other` touch.
fn shared_edge(panel: &Panel, other: &Panel) -> Option<(usize, usize)> {
    let key = |(a, b): (usize, usize)| (a.min(b), a.max(b));
    (0..panel.shape.vertex_count()).find_map(|k| {
        let edge = key(panel.edge(k));
        (0..other.shape.vertex_count())
            .find(|&kq| key(other.edge(kq)) == edge)
            .map(|kq| (k, kq))
    })
}
