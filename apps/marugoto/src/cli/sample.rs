//! Sample content for `marugoto sample`.
//!
//! A small game with a branching route, a task hub and one character whose
//! dialog sends the player to the final waypoint, plus a running play-through.

use chrono::{Duration, Utc};
use marugoto_core::{Graph, IdStrategy, MarugotoError, NodeId};

/// Email of the sample instance host.
pub const SAMPLE_HOST: &str = "host@marugoto.example";

/// Email of the player who joined the sample instance.
pub const SAMPLE_PLAYER: &str = "player@marugoto.example";

/// The sample graph and its roots.
#[derive(Debug, Clone)]
pub struct SampleContent {
    pub graph: Graph,
    pub game: NodeId,
    pub instance: NodeId,
}

/// Build the sample game titled `title`.
///
/// ```text
///        start ---> w1 ---> knot [t1, t2, t3] ---> end
///          \                ^                       ^
///           +----> w2 ------+        dialog --------+
/// ```
pub fn sample_content(title: &str, strategy: IdStrategy) -> Result<SampleContent, MarugotoError> {
    let mut graph = Graph::with_strategy(strategy);

    let game = graph.create_game(title);
    let start = graph.create_waypoint(game, "start")?;
    let w1 = graph.create_waypoint(game, "north road")?;
    let w2 = graph.create_waypoint(game, "south road")?;
    let knot = graph.create_waypoint(game, "market")?;
    let end = graph.create_waypoint(game, "harbour")?;

    graph.add_destination(start, w1, Some(2.0))?;
    graph.add_destination(start, w2, None)?;
    graph.add_destination(w1, knot, None)?;
    graph.add_destination(w2, knot, None)?;
    graph.add_destination(knot, end, None)?;
    for (name, solution) in [("buy bread", None), ("ask for directions", Some("harbour"))] {
        let task = graph.create_task(name, format!("At the market: {}", name), solution);
        graph.add_task(knot, task)?;
    }
    graph.set_start(game, start)?;

    let dialog = graph.create_dialog();
    let greeting = graph.create_mail(dialog, "Welcome", "Meet me at the market.")?;
    let hint = graph.create_speech(dialog, "The harbour is past the market.")?;
    let farewell = graph.create_speech(dialog, "See you at the harbour.")?;
    let riddle = graph.create_task("answer the riddle", "What floats but never sails?", Some("a cloud"));
    graph.set_start(dialog, greeting)?;
    graph.offer_at(greeting, start)?;
    graph.add_follow_up(greeting, hint, None)?;
    graph.add_follow_up(hint, farewell, Some(riddle))?;
    graph.set_destination(farewell, end)?;

    let npc = graph.create_npc("Aiko", "guide", dialog)?;
    graph.add_non_playable_character(game, npc)?;

    let host = graph.create_player(SAMPLE_HOST, "Host");
    let player = graph.create_player(SAMPLE_PLAYER, "Player");
    let now = Utc::now();
    let instance = graph.start_new_instance(game, "first run", host, now, now + Duration::days(7))?;
    graph.add_player(instance, player, "Ken", "traveller")?;
    graph.advance_player(instance, player, w1)?;

    Ok(SampleContent {
        graph,
        game,
        instance,
    })
}
