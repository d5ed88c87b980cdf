use crate::agent::{AgentId, AgentType};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha12Rng;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("agent {0} is already scheduled")]
    AlreadyRegistered(AgentId),
    #[error("agent {0} is not scheduled")]
    NotRegistered(AgentId),
}

/// Random activation grouped by agent type.
///
/// Types are activated in the order they were first registered (optionally
/// shuffled), and the members of each type in a fresh random order every
/// step. Each type's membership is snapshotted right before it is iterated:
/// agents added while stepping wait for the next step, and agents removed
/// while stepping are skipped if they have not been reached yet.
#[derive(Clone, Debug)]
pub struct Scheduler {
    buckets: Vec<(AgentType, BTreeSet<AgentId>)>,
    index: HashMap<AgentId, AgentType>,
    rng: ChaCha12Rng,
    shuffle_types: bool,
    time: u64,
}

impl Scheduler {
    pub fn new(rng: ChaCha12Rng, shuffle_types: bool) -> Self {
        Self {
            buckets: Vec::new(),
            index: HashMap::new(),
            rng,
            shuffle_types,
            time: 0,
        }
    }

    /// Number of completed `step` calls.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.index.contains_key(&agent)
    }

    pub fn agent_type(&self, agent: AgentId) -> Option<AgentType> {
        self.index.get(&agent).copied()
    }

    /// Types in activation order (before any per-step shuffle).
    pub fn types(&self) -> impl Iterator<Item = AgentType> + '_ {
        self.buckets.iter().map(|(t, _)| *t)
    }

    fn bucket(&self, agent_type: AgentType) -> Option<&BTreeSet<AgentId>> {
        self.buckets
            .iter()
            .find(|(t, _)| *t == agent_type)
            .map(|(_, members)| members)
    }

    pub fn add(&mut self, agent: AgentId, agent_type: AgentType) -> Result<(), ScheduleError> {
        if self.index.contains_key(&agent) {
            return Err(ScheduleError::AlreadyRegistered(agent));
        }
        self.index.insert(agent, agent_type);
        match self.buckets.iter_mut().find(|(t, _)| *t == agent_type) {
            Some((_, members)) => {
                members.insert(agent);
            }
            None => self.buckets.push((agent_type, BTreeSet::from([agent]))),
        }
        Ok(())
    }

    pub fn remove(&mut self, agent: AgentId) -> Result<AgentType, ScheduleError> {
        let agent_type = self
            .index
            .remove(&agent)
            .ok_or(ScheduleError::NotRegistered(agent))?;
        if let Some((_, members)) = self.buckets.iter_mut().find(|(t, _)| *t == agent_type) {
            members.remove(&agent);
        }
        Ok(agent_type)
    }

    /// Activate every live agent of the matching types once.
    ///
    /// `activate` receives the scheduler itself so an agent can register
    /// offspring or deregister itself mid-step. The first error aborts the
    /// step without advancing `time`.
    pub fn step<F, E>(&mut self, filter: Option<&[AgentType]>, mut activate: F) -> Result<(), E>
    where
        F: FnMut(&mut Scheduler, AgentId, AgentType) -> Result<(), E>,
    {
        let mut order: Vec<AgentType> = self
            .types()
            .filter(|t| filter.map_or(true, |allowed| allowed.contains(t)))
            .collect();
        if self.shuffle_types {
            order.shuffle(&mut self.rng);
        }
        for agent_type in order {
            let mut snapshot: Vec<AgentId> = self
                .bucket(agent_type)
                .map(|members| members.iter().copied().collect())
                .unwrap_or_default();
            snapshot.shuffle(&mut self.rng);
            for agent in snapshot {
                if !self.contains(agent) {
                    continue;
                }
                activate(self, agent, agent_type)?;
            }
        }
        self.time += 1;
        Ok(())
    }

    /// Live agents of exactly `agent_type`.
    pub fn type_count(&self, agent_type: AgentType) -> usize {
        self.bucket(agent_type).map_or(0, BTreeSet::len)
    }

    pub fn count_where(
        &self,
        agent_type: AgentType,
        mut predicate: impl FnMut(AgentId) -> bool,
    ) -> usize {
        self.bucket(agent_type)
            .map_or(0, |members| members.iter().filter(|&&a| predicate(a)).count())
    }

    pub fn agents_of(&self, agent_type: AgentType) -> impl Iterator<Item = AgentId> + '_ {
        self.bucket(agent_type).into_iter().flatten().copied()
    }

    /// Mean of `value` over live agents of the given types, `None` if there
    /// are none. Stops at the first error `value` returns.
    pub fn mean_over<E>(
        &self,
        types: &[AgentType],
        mut value: impl FnMut(AgentId) -> Result<f64, E>,
    ) -> Result<Option<f64>, E> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &agent_type in types {
            for agent in self.agents_of(agent_type) {
                sum += value(agent)?;
                count += 1;
            }
        }
        Ok((count > 0).then(|| sum / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn make_scheduler() -> Scheduler {
        Scheduler::new(ChaCha12Rng::seed_from_u64(7), false)
    }

    #[test]
    fn add_and_remove_keep_counts_by_exact_type() {
        let mut s = make_scheduler();
        s.add(AgentId(0), AgentType::Patch).unwrap();
        s.add(AgentId(1), AgentType::WhiteDaisy).unwrap();
        s.add(AgentId(2), AgentType::WhiteDaisy).unwrap();
        assert_eq!(s.type_count(AgentType::Patch), 1);
        assert_eq!(s.type_count(AgentType::WhiteDaisy), 2);
        assert_eq!(s.type_count(AgentType::BlackDaisy), 0);
        assert_eq!(s.remove(AgentId(1)), Ok(AgentType::WhiteDaisy));
        assert_eq!(s.type_count(AgentType::WhiteDaisy), 1);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn double_registration_and_unknown_removal_are_reported() {
        let mut s = make_scheduler();
        s.add(AgentId(3), AgentType::Patch).unwrap();
        assert_eq!(
            s.add(AgentId(3), AgentType::BlackDaisy),
            Err(ScheduleError::AlreadyRegistered(AgentId(3)))
        );
        assert_eq!(
            s.remove(AgentId(9)),
            Err(ScheduleError::NotRegistered(AgentId(9)))
        );
    }

    #[test]
    fn step_activates_types_in_registration_order() {
        let mut s = make_scheduler();
        s.add(AgentId(10), AgentType::BlackDaisy).unwrap();
        for i in 0..5 {
            s.add(AgentId(i), AgentType::Patch).unwrap();
        }
        let mut seen = Vec::new();
        s.step::<_, ()>(None, |_, id, t| {
            seen.push((id, t));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], (AgentId(10), AgentType::BlackDaisy));
        assert!(seen[1..].iter().all(|(_, t)| *t == AgentType::Patch));
        assert_eq!(s.time(), 1);
    }

    #[test]
    fn agents_added_mid_step_wait_for_next_step() {
        let mut s = make_scheduler();
        s.add(AgentId(0), AgentType::WhiteDaisy).unwrap();
        let mut next = 100;
        let mut seen = Vec::new();
        s.step::<_, ()>(None, |sched, id, _| {
            seen.push(id);
            sched.add(AgentId(next), AgentType::WhiteDaisy).unwrap();
            next += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![AgentId(0)]);
        assert_eq!(s.type_count(AgentType::WhiteDaisy), 2);

        seen.clear();
        s.step::<_, ()>(None, |_, id, _| {
            seen.push(id);
            Ok(())
        })
        .unwrap();
        seen.sort();
        assert_eq!(seen, vec![AgentId(0), AgentId(100)]);
    }

    #[test]
    fn removals_mid_step_neither_skip_nor_repeat_siblings() {
        let mut s = make_scheduler();
        for i in 0..20 {
            s.add(AgentId(i), AgentType::BlackDaisy).unwrap();
        }
        let mut visits = HashMap::new();
        s.step::<_, ()>(None, |sched, id, _| {
            *visits.entry(id).or_insert(0) += 1;
            sched.remove(id).unwrap();
            Ok(())
        })
        .unwrap();
        assert_eq!(visits.len(), 20);
        assert!(visits.values().all(|&v| v == 1));
        assert!(s.is_empty());
    }

    #[test]
    fn agent_removed_by_sibling_is_not_activated() {
        let mut s = make_scheduler();
        s.add(AgentId(0), AgentType::WhiteDaisy).unwrap();
        s.add(AgentId(1), AgentType::WhiteDaisy).unwrap();
        let mut seen = Vec::new();
        s.step::<_, ()>(None, |sched, id, _| {
            seen.push(id);
            let other = AgentId(1 - id.0);
            if sched.contains(other) {
                sched.remove(other).unwrap();
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn filter_restricts_activated_types() {
        let mut s = make_scheduler();
        s.add(AgentId(0), AgentType::Patch).unwrap();
        s.add(AgentId(1), AgentType::WhiteDaisy).unwrap();
        s.add(AgentId(2), AgentType::BlackDaisy).unwrap();
        let daisies = [AgentType::WhiteDaisy, AgentType::BlackDaisy];
        let mut seen = Vec::new();
        s.step::<_, ()>(Some(&daisies), |_, id, _| {
            seen.push(id);
            Ok(())
        })
        .unwrap();
        seen.sort();
        assert_eq!(seen, vec![AgentId(1), AgentId(2)]);
    }

    #[test]
    fn error_aborts_step_without_advancing_time() {
        let mut s = make_scheduler();
        s.add(AgentId(0), AgentType::Patch).unwrap();
        let result = s.step(None, |_, id, _| Err(id));
        assert_eq!(result, Err(AgentId(0)));
        assert_eq!(s.time(), 0);
    }

    #[test]
    fn same_seed_gives_same_activation_order() {
        let order = || {
            let mut s = make_scheduler();
            for i in 0..30 {
                s.add(AgentId(i), AgentType::Patch).unwrap();
            }
            let mut seen = Vec::new();
            s.step::<_, ()>(None, |_, id, _| {
                seen.push(id);
                Ok(())
            })
            .unwrap();
            seen
        };
        assert_eq!(order(), order());
    }

    #[test]
    fn count_where_and_mean_over_use_live_members() {
        let mut s = make_scheduler();
        for i in 0..4 {
            s.add(AgentId(i), AgentType::Patch).unwrap();
        }
        s.add(AgentId(9), AgentType::BlackDaisy).unwrap();
        assert_eq!(s.count_where(AgentType::Patch, |id| id.0 % 2 == 0), 2);
        let by_id = |id: AgentId| Ok::<_, AgentId>(id.0 as f64);
        let mean = s.mean_over(&[AgentType::Patch], by_id).unwrap().unwrap();
        assert!((mean - 1.5).abs() < 1e-12);
        let mean_all = s.mean_over(&AgentType::ALL, by_id).unwrap().unwrap();
        assert!((mean_all - 3.0).abs() < 1e-12);
        assert_eq!(s.mean_over(&[AgentType::WhiteDaisy], by_id), Ok(None));
        assert_eq!(
            s.mean_over(&[AgentType::BlackDaisy], |id| Err(id)),
            Err(AgentId(9))
        );
    }
}
