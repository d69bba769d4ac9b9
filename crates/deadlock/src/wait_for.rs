//! Wait-for graph over philosophers at a table.
//!
//! Each philosopher that holds its left fork and waits to try the right one
//! contributes one edge: `waiter -> holder of the wanted fork`. A cycle in
//! that graph is a circular wait, i.e. a real deadlock rather than a table
//! that merely happens to be idle.

use crate::Participant;
use std::collections::{BTreeMap, HashMap};
use symposium_types::{ForkId, PhilosopherId};

/// Wait-for graph built from one snapshot of a table.
///
/// Keeps a holder index next to the edge list so a waiter's edge can be
/// resolved without scanning every participant:
///
/// 1. Given a fork, which philosopher holds it?
/// 2. Given a philosopher, whom is it waiting on?
#[derive(Debug, Default)]
pub struct WaitForGraph {
    /// fork -> philosopher holding it
    holders: HashMap<ForkId, PhilosopherId>,
    /// waiter -> philosopher holding the fork it wants
    waits_on: BTreeMap<PhilosopherId, PhilosopherId>,
}

impl WaitForGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from a table snapshot.
    ///
    /// Participants that are no longer live hold nothing and wait on nothing.
    pub fn from_participants(participants: &[Participant]) -> Self {
        let mut graph = Self::new();

        // Index holders first so every wanted fork can be resolved
        for p in participants.iter().filter(|p| p.live) {
            for &fork in &p.held {
                graph.holders.insert(fork, p.philosopher);
            }
        }

        for p in participants.iter().filter(|p| p.live) {
            if let Some(wanted) = p.wanted {
                graph.add_wait(p.philosopher, wanted);
            }
        }

        graph
    }

    /// Record that `holder` holds `fork`.
    pub fn add_holder(&mut self, fork: ForkId, holder: PhilosopherId) {
        self.holders.insert(fork, holder);
    }

    /// Record that `waiter` wants `fork`.
    ///
    /// Adds an edge only if somebody else holds the fork; a free fork or one
    /// the waiter already holds blocks nobody.
    pub fn add_wait(&mut self, waiter: PhilosopherId, fork: ForkId) {
        match self.holders.get(&fork) {
            Some(&holder) if holder != waiter => {
                self.waits_on.insert(waiter, holder);
            }
            _ => {}
        }
    }

    /// Whom `waiter` is blocked on, if anyone.
    pub fn waits_on(&self, waiter: PhilosopherId) -> Option<PhilosopherId> {
        self.waits_on.get(&waiter).copied()
    }

    /// Get the number of wait edges.
    pub fn len(&self) -> usize {
        self.waits_on.len()
    }

    /// Check if the graph has no wait edges.
    pub fn is_empty(&self) -> bool {
        self.waits_on.is_empty()
    }

    /// Find a cycle of waiting philosophers.
    ///
    /// Every philosopher waits on at most one other, so each node has
    /// out-degree at most one and following edges from any start either
    /// dead-ends or closes a loop. Returns the loop members in wait order,
    /// starting from the smallest id on the loop.
    pub fn find_cycle(&self) -> Option<Vec<PhilosopherId>> {
        for &start in self.waits_on.keys() {
            let mut path: Vec<PhilosopherId> = vec![start];
            let mut current = start;

            while let Some(next) = self.waits_on(current) {
                if let Some(pos) = path.iter().position(|&p| p == next) {
                    let mut cycle = path.split_off(pos);
                    let min = cycle
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, p)| **p)
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    cycle.rotate_left(min);
                    return Some(cycle);
                }
                path.push(next);
                current = next;
            }
        }
        None
    }
}
