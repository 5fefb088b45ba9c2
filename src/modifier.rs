//! Capabilities ("powers") that intercept decisions and mutations.
//!
//! A modifier is a single record carrying explicit predicate fields — an
//! applicability function, a must-use flag, a cost and optional lifecycle
//! hooks — rather than a type hierarchy. Powers are declared statically in
//! the `powers` registry and instantiated transiently against the current
//! decision or mutation during discovery; they are never cached across
//! turns.
//!
//! Discovery is a plain linear scan over the capability hosts that are
//! currently live: revealed denizens, owned advisers, held relics, banners
//! and the fixed reliquary slot set. The dataset is small; correctness
//! matters more than micro-optimizing this query.

use crate::action::ActionKind;
use crate::choice::ChoiceSchema;
use crate::effect::{Effect, EffectKind, FailReason};
use crate::engine::ActionContext;
use crate::game_state::GameState;
use crate::ids::{CardId, EntityId, PlayerId};

// ============================================================================
// Record
// ============================================================================

/// What a modifier intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierTarget {
    Action(ActionKind),
    Effect(EffectKind),
}

/// The cost a selected modifier must pay before its hooks run, drawn from
/// its owner's purse. Failure to pay aborts the whole decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierCost {
    pub favor: u32,
    pub secrets: u32,
}

impl ModifierCost {
    pub fn free() -> Self {
        Self::default()
    }

    pub fn favor(amount: u32) -> Self {
        Self {
            favor: amount,
            secrets: 0,
        }
    }

    pub fn secrets(amount: u32) -> Self {
        Self {
            favor: 0,
            secrets: amount,
        }
    }

    pub fn is_free(&self) -> bool {
        self.favor == 0 && self.secrets == 0
    }
}

/// Applicability predicate, tested at discovery.
pub type AppliesFn = fn(&GameState, &Modifier) -> bool;
/// Declare-conflicts hook: indices into the offered optional set this
/// modifier cancels.
pub type IgnoresFn = fn(&GameState, &Modifier, &[Modifier]) -> Vec<usize>;
/// At-start hook: may alter the decision's choice schema before it is
/// offered.
pub type AtStartFn = fn(&GameState, &Modifier, &mut ChoiceSchema);
/// Before hook: runs after cost payment; returning `false` vetoes the
/// decision (abandoned, not retried).
pub type BeforeFn =
    fn(&mut GameState, &Modifier, &mut ActionContext) -> Result<bool, FailReason>;
/// During/after hooks around a decision's core logic.
pub type ActionHookFn =
    fn(&mut GameState, &Modifier, &mut ActionContext) -> Result<(), FailReason>;
/// Pre/post hooks around a mutation's resolution. The pre hook may adjust
/// the effect's fields via `effect::downcast_effect_mut`.
pub type EffectHookFn = fn(&mut GameState, &Modifier, &mut dyn Effect) -> Result<(), FailReason>;

/// Lifecycle hooks, shaped by what the modifier targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionHooks {
    pub at_start: Option<AtStartFn>,
    pub before: Option<BeforeFn>,
    pub during: Option<ActionHookFn>,
    pub after: Option<ActionHookFn>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EffectHooks {
    pub pre: Option<EffectHookFn>,
    pub post: Option<EffectHookFn>,
}

#[derive(Debug, Clone, Copy)]
pub enum ModifierHooks {
    Action(ActionHooks),
    Effect(EffectHooks),
}

/// One capability, instantiated against the current decision or mutation.
#[derive(Debug, Clone)]
pub struct Modifier {
    /// The entity hosting this capability.
    pub source: EntityId,
    /// The player controlling the source at discovery time, if any.
    pub owner: Option<PlayerId>,
    /// The card definition the capability belongs to.
    pub card: CardId,
    pub name: &'static str,
    pub target: ModifierTarget,
    /// Must-use capabilities are auto-applied and never offered as a choice.
    pub must_use: bool,
    pub cost: ModifierCost,
    pub applies: Option<AppliesFn>,
    pub ignores: Option<IgnoresFn>,
    pub hooks: ModifierHooks,
}

impl Modifier {
    pub fn action_hooks(&self) -> ActionHooks {
        match self.hooks {
            ModifierHooks::Action(hooks) => hooks,
            ModifierHooks::Effect(_) => ActionHooks::default(),
        }
    }

    pub fn effect_hooks(&self) -> EffectHooks {
        match self.hooks {
            ModifierHooks::Effect(hooks) => hooks,
            ModifierHooks::Action(_) => EffectHooks::default(),
        }
    }
}

// ============================================================================
// Discovery
// ============================================================================

/// The outcome of discovery and filtering for one decision.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredModifiers {
    /// Auto-applied, in discovery order.
    pub must_use: Vec<Modifier>,
    /// Offered to the deciding player as a 0..N multi-select, after
    /// mutual-ignore resolution.
    pub optional: Vec<Modifier>,
}

/// Enumerate every live capability host: `(entity, controlling player)`.
fn capability_hosts(game: &GameState) -> Vec<(EntityId, Option<PlayerId>)> {
    let mut hosts: Vec<(EntityId, Option<PlayerId>)> = Vec::new();
    let mut seen: Vec<EntityId> = Vec::new();
    let mut push = |hosts: &mut Vec<(EntityId, Option<PlayerId>)>,
                    id: EntityId,
                    owner: Option<PlayerId>| {
        if !seen.contains(&id) {
            seen.push(id);
            hosts.push((id, owner));
        }
    };

    // Revealed denizens, controlled by their site's ruler.
    for entity in game.entities() {
        if entity.kind == crate::entity::EntityKind::Denizen && entity.face_up {
            let ruler = entity
                .site
                .and_then(|s| game.entity(s).ok())
                .and_then(|s| s.ruler);
            push(&mut hosts, entity.id, ruler);
        }
    }
    // Owned advisers and held relics.
    for player in &game.players {
        for &adviser in &player.advisers {
            if game.entity(adviser).map(|e| e.face_up).unwrap_or(false) {
                push(&mut hosts, adviser, Some(player.id));
            }
        }
        for &relic in &player.relics {
            if game.entity(relic).map(|e| e.face_up).unwrap_or(false) {
                push(&mut hosts, relic, Some(player.id));
            }
        }
    }
    // Banners, controlled by their ruler.
    for entity in game.entities() {
        if entity.kind == crate::entity::EntityKind::Banner && entity.face_up {
            push(&mut hosts, entity.id, entity.ruler);
        }
    }
    // The fixed reliquary slot set.
    for &slot in &game.reliquary {
        if game.entity(slot).map(|e| e.face_up).unwrap_or(false) {
            let owner = game.entity(slot).ok().and_then(|e| e.ruler);
            push(&mut hosts, slot, owner);
        }
    }
    hosts
}

fn instantiate_matching(
    game: &GameState,
    target: ModifierTarget,
) -> Vec<Modifier> {
    let mut found = Vec::new();
    for (source, owner) in capability_hosts(game) {
        let Ok(entity) = game.entity(source) else {
            continue;
        };
        let Some(card) = entity.card else { continue };
        for spec in game.registry.powers(card) {
            if spec.target != target {
                continue;
            }
            let modifier = spec.instantiate(source, owner);
            let applicable = modifier
                .applies
                .map(|applies| applies(game, &modifier))
                .unwrap_or(true);
            if applicable {
                found.push(modifier);
            }
        }
    }
    found
}

/// Discover, partition and conflict-filter the modifiers for a decision.
/// Run once per decision — never cached.
pub fn discover_for_action(game: &GameState, kind: ActionKind) -> DiscoveredModifiers {
    let all = instantiate_matching(game, ModifierTarget::Action(kind));
    let (must_use, optional): (Vec<_>, Vec<_>) = all.into_iter().partition(|m| m.must_use);
    let (optional, excluded_names) = resolve_ignores(game, optional);
    // A capability excluded by a cancellation cycle is barred from must-use
    // application as well.
    let must_use = must_use
        .into_iter()
        .filter(|m| !excluded_names.contains(&m.name))
        .collect();
    DiscoveredModifiers { must_use, optional }
}

/// Discover the must-use modifiers for a mutation. Effect modifiers are
/// always must-use; the registry enforces that at construction.
pub fn discover_for_effect(game: &GameState, kind: EffectKind) -> Vec<Modifier> {
    instantiate_matching(game, ModifierTarget::Effect(kind))
}

/// Run the declare-conflicts hooks and drop cancelled capabilities.
///
/// Cancellation is symmetric-safe: every capability on a cancellation cycle
/// is excluded. Off-cycle, a cancellation only sticks if the cancelling
/// capability itself survives.
fn resolve_ignores(
    game: &GameState,
    optional: Vec<Modifier>,
) -> (Vec<Modifier>, Vec<&'static str>) {
    let n = optional.len();
    if n == 0 {
        return (optional, Vec::new());
    }
    let edges: Vec<Vec<usize>> = optional
        .iter()
        .map(|m| {
            m.ignores
                .map(|ignores| {
                    ignores(game, m, &optional)
                        .into_iter()
                        .filter(|&j| j < n)
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    // A node is on a cycle if it can reach itself through at least one edge.
    let mut in_cycle = vec![false; n];
    for start in 0..n {
        let mut stack: Vec<usize> = edges[start].clone();
        let mut visited = vec![false; n];
        while let Some(node) = stack.pop() {
            if node == start {
                in_cycle[start] = true;
                break;
            }
            if !visited[node] {
                visited[node] = true;
                stack.extend(edges[node].iter().copied());
            }
        }
    }

    // Off-cycle exclusion: cancelled by a surviving canceller. The surviving
    // subgraph is acyclic, so the recursion terminates.
    fn excluded(
        j: usize,
        edges: &[Vec<usize>],
        in_cycle: &[bool],
        memo: &mut [Option<bool>],
    ) -> bool {
        if in_cycle[j] {
            return true;
        }
        if let Some(done) = memo[j] {
            return done;
        }
        // Mark in-progress as not excluded to cut duplicate work; acyclic
        // among off-cycle nodes, so this cannot be observed mid-cycle.
        memo[j] = Some(false);
        let result = (0..edges.len()).any(|i| {
            i != j
                && edges[i].contains(&j)
                && !in_cycle[i]
                && !excluded(i, edges, in_cycle, memo)
        });
        memo[j] = Some(result);
        result
    }

    let mut memo: Vec<Option<bool>> = vec![None; n];
    let mut excluded_names = Vec::new();
    let mut kept = Vec::new();
    for (j, modifier) in optional.into_iter().enumerate() {
        if excluded(j, &edges, &in_cycle, &mut memo) {
            excluded_names.push(modifier.name);
        } else {
            kept.push(modifier);
        }
    }
    (kept, excluded_names)
}
