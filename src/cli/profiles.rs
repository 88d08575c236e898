// src/cli/profiles.rs — Counter-agent profile listing and seeding

use std::sync::{Arc, Mutex};

use anyhow::anyhow;

use crate::core::types::{CounterProfile, ProfileDials};
use crate::infra::errors::ScrimmageError;
use crate::store::Store;

/// Built-in personas inserted on first use so a sweep works out of the box.
/// Each one embodies a different way real calls die.
pub fn builtin_profiles() -> Vec<CounterProfile> {
    vec![
        CounterProfile::new(
            "budget-hawk",
            "You want the product but are certain every quoted price carries at least \
             twenty percent of fat. Demand a discount in your second or third reply and \
             repeat the demand at least twice more, in different words. Treat any refusal \
             as an opening bid. Only agree to sign if the agent holds the price and makes \
             the monthly math feel undeniable.",
            ProfileDials {
                hostility: 4,
                patience: 5,
                price_sensitivity: 9,
            },
        ),
        CounterProfile::new(
            "spreadsheet-skeptic",
            "You are an engineer who has already built your own cost model. Challenge \
             every number the agent uses: recompute it out loud, round differently, and \
             claim one figure is wrong even when it is not. If the agent concedes a wrong \
             number or waffles, lose interest fast. If they defend the math cleanly, \
             become genuinely cooperative.",
            ProfileDials {
                hostility: 3,
                patience: 7,
                price_sensitivity: 7,
            },
        ),
        CounterProfile::new(
            "stonewaller",
            "Give short, flat answers. Volunteer nothing. Deflect commitment with \
             'I'd have to think about it' and 'my spouse handles this'. Never raise an \
             objection the agent could address directly; make them dig for one. Agree \
             to sign only if the agent creates urgency you actually feel.",
            ProfileDials {
                hostility: 6,
                patience: 2,
                price_sensitivity: 5,
            },
        ),
        CounterProfile::new(
            "friendly-drifter",
            "You are warm, chatty, and endlessly agreeable. Drift off topic with stories \
             about your neighbor, your roof, your dog. Say yes to every point but treat \
             the close itself as something to schedule for later. Sign only if the agent \
             politely keeps control of the call and walks you to the finish line today.",
            ProfileDials {
                hostility: 1,
                patience: 9,
                price_sensitivity: 3,
            },
        ),
        CounterProfile::new(
            "burned-before",
            "A previous contractor overpromised and underdelivered, and it cost you real \
             money. Open hostile. Bring up the old story early and again near the end. \
             Demand specifics in writing and threaten to hang up once, mid-call. Warm up \
             only to an agent who acknowledges the history instead of talking past it.",
            ProfileDials {
                hostility: 8,
                patience: 4,
                price_sensitivity: 6,
            },
        ),
    ]
}

/// Insert any built-in profile not already present, matched by name.
/// User-created profiles are never touched.
pub fn ensure_seeded(store: &Arc<Mutex<Store>>) -> anyhow::Result<usize> {
    let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
    let mut inserted = 0;
    for profile in builtin_profiles() {
        if store.get_profile_by_name(&profile.name)?.is_none() {
            store.insert_profile(&profile)?;
            inserted += 1;
        }
    }
    if inserted > 0 {
        tracing::info!(inserted, "seeded built-in counter profiles");
    }
    Ok(inserted)
}

/// Look up a profile by name first, then by id.
pub fn resolve_profile(
    store: &Arc<Mutex<Store>>,
    key: &str,
) -> Result<CounterProfile, ScrimmageError> {
    let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
    if let Some(profile) = store.get_profile_by_name(key)? {
        return Ok(profile);
    }
    if let Some(profile) = store.get_profile(key)? {
        return Ok(profile);
    }
    Err(ScrimmageError::ProfileNotFound { id: key.to_string() })
}

pub fn run_profiles(store: &Arc<Mutex<Store>>, seed: bool) -> anyhow::Result<()> {
    if seed {
        let inserted = ensure_seeded(store)?;
        if inserted > 0 {
            println!("Seeded {inserted} built-in profile(s).");
        }
    }

    let profiles = {
        let store = store.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        store.list_profiles()?
    };

    if profiles.is_empty() {
        println!("No counter profiles yet. Run `scrimmage profiles --seed` to install the built-ins.");
        return Ok(());
    }

    println!("{} counter-agent profile(s):", profiles.len());
    for profile in &profiles {
        println!();
        println!("  {}  [{}]", profile.name, short_id(&profile.id));
        println!("    dials: {}", profile.dials.render());
        println!("    {}", summary_line(&profile.instructions));
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// First sentence of the instructions, capped for one-line display.
fn summary_line(instructions: &str) -> String {
    let first = instructions
        .split('.')
        .next()
        .unwrap_or(instructions)
        .trim();
    let mut line: String = first.chars().take(90).collect();
    if line.len() < first.len() {
        line.push_str("...");
    } else {
        line.push('.');
    }
    line
}
