use rand::{SeedableRng, rngs::StdRng};
use tool_use_core::{
    Direction, Position,
    bridge_building::{
        BUILT_BRIDGE, BridgeAction, BridgeBuilding, BridgeBuildingConfig, BridgeLevel, BridgeRules,
        FELL_INTO_WATER, MOVED_ACROSS_BRIDGE, MOVED_BOX_INTO_WATER, REACHED_GOAL,
    },
    environment::{Episode, EpisodeState, Game},
    levels::RiverOptions,
    plot::Outcome,
};

use BridgeAction::{Move, Stay};
use Direction::{East, North, South, West};

fn river_episode(rules: BridgeRules) -> Episode<BridgeBuilding> {
    let config = BridgeBuildingConfig {
        level: BridgeLevel::River(RiverOptions::fixed(1)),
        rules,
    };
    let mut episode = Episode::new(config, 0);
    episode.reset().unwrap();
    episode
}

fn player(episode: &Episode<BridgeBuilding>) -> Position {
    episode.game().unwrap().player().position()
}

#[test]
fn three_rights_and_three_ups_reach_the_goal() {
    let mut art = vec![" ".repeat(10); 10];
    art[6].replace_range(2..3, "P");
    art[3].replace_range(5..6, "G");
    let mut episode = Episode::<BridgeBuilding>::new(BridgeBuildingConfig::from_art(&art), 0);
    episode.reset().unwrap();

    for action in [Move(East), Move(East), Move(East), Move(North), Move(North)] {
        let step = episode.step(action).unwrap();
        assert_eq!(step.reward, 0.0);
        assert!(!step.terminated);
    }
    let step = episode.step(Move(North)).unwrap();
    assert_eq!(step.reward, 1.0);
    assert!(step.terminated);
    assert!(step.info.is_set(REACHED_GOAL));
    assert_eq!(episode.state(), EpisodeState::Terminated(Outcome::Success));
}

#[test]
fn moves_off_the_board_are_no_ops() {
    let mut episode = Episode::<BridgeBuilding>::new(BridgeBuildingConfig::from_art(&["P ", " G"]), 0);
    let first = episode.reset().unwrap();
    for action in [Move(North), Move(West), Stay] {
        let step = episode.step(action).unwrap();
        assert_eq!(step.observation, first);
        assert_eq!(step.reward, 0.0);
        assert!(step.info.is_empty());
    }
}

#[test]
fn walking_into_the_river_is_fatal() {
    let mut episode = river_episode(BridgeRules::default());
    assert_eq!(player(&episode), Position::new(1, 4));
    episode.step(Move(South)).unwrap();
    episode.step(Move(South)).unwrap();
    let step = episode.step(Move(South)).unwrap();
    assert_eq!(step.reward, -1.0);
    assert!(step.terminated);
    assert!(step.info.is_set(FELL_INTO_WATER));
    assert_eq!(episode.state(), EpisodeState::Terminated(Outcome::Failure));
}

#[test]
fn hydrophobic_player_stops_at_the_bank() {
    let rules = BridgeRules {
        hydrophobic: true,
        ..BridgeRules::default()
    };
    let mut episode = river_episode(rules);
    for _ in 0..4 {
        let step = episode.step(Move(South)).unwrap();
        assert_eq!(step.reward, 0.0);
        assert!(!step.terminated);
    }
    assert_eq!(player(&episode), Position::new(3, 4));
}

#[test]
fn bridge_then_cross_then_goal() {
    let mut episode = river_episode(BridgeRules::default());
    // Box 0 starts at (2, 1); line up behind it.
    for _ in 0..3 {
        episode.step(Move(West)).unwrap();
    }
    assert_eq!(player(&episode), Position::new(1, 1));
    episode.step(Move(South)).unwrap();

    let step = episode.step(Move(South)).unwrap();
    assert!(step.info.is_set(MOVED_BOX_INTO_WATER));
    assert!(step.info.is_set(BUILT_BRIDGE));
    assert_eq!(step.observation.board[Position::new(4, 1)], 'B');
    let game = episode.game().unwrap();
    assert_eq!(game.box_sprite(0).unwrap().position(), None);
    assert!(game.water().is_bridge(Position::new(4, 1)));

    let step = episode.step(Move(South)).unwrap();
    assert!(step.info.is_set(MOVED_ACROSS_BRIDGE));
    assert!(!step.terminated);
    assert_eq!(player(&episode), Position::new(4, 1));

    let mut total = 0.0;
    for action in [Move(South), Move(South), Move(South), Move(East), Move(East), Move(East)] {
        let step = episode.step(action).unwrap();
        total += step.reward;
    }
    assert_eq!(total, 1.0);
    assert_eq!(episode.state(), EpisodeState::Terminated(Outcome::Success));
    assert_eq!(episode.steps(), 12);
}

#[test]
fn random_play_preserves_the_board_inventory() {
    let mut rng = StdRng::seed_from_u64(11);
    for seed in 0..40 {
        let mut episode =
            Episode::<BridgeBuilding>::new(BridgeBuildingConfig::default(), seed).with_max_steps(60);
        episode.reset().unwrap();
        let game = episode.game().unwrap();
        let cells = game.water().water().count() + game.water().bridges().count();
        let walls = game.walls().count();

        while !episode.is_done() {
            let action = BridgeBuilding::sample_action(&mut rng);
            let step = episode.step(action).unwrap();
            assert!([-1.0, 0.0, 1.0].contains(&step.reward));

            let game = episode.game().unwrap();
            assert_eq!(game.water().water().count() + game.water().bridges().count(), cells);
            assert_eq!(game.walls().count(), walls);
            let positions: Vec<Position> = game.boxes().iter().filter_map(|b| b.position()).collect();
            for (i, p) in positions.iter().enumerate() {
                assert!(!game.walls().is_set(*p));
                assert!(!game.water().is_water(*p));
                assert_ne!(*p, game.player().position());
                assert!(!positions[i + 1..].contains(p));
            }
        }
    }
}

#[test]
fn tool_use_boards_play_out() {
    for seed in 0..40 {
        let mut episode =
            Episode::<BridgeBuilding>::new(BridgeBuildingConfig::tool_use(), seed).with_max_steps(20);
        let first = episode.reset().unwrap();
        assert_eq!(first.board.height(), 8);
        let mut agent_rng = StdRng::seed_from_u64(seed);
        while !episode.is_done() {
            episode.step(BridgeBuilding::sample_action(&mut agent_rng)).unwrap();
        }
        assert!(episode.steps() <= 20);
    }
}

#[test]
fn tool_use_player_is_held_at_the_bank() {
    assert!(BridgeBuildingConfig::tool_use().rules.hydrophobic);
    let mut blocked = 0;
    for seed in 0..40 {
        let mut episode =
            Episode::<BridgeBuilding>::new(BridgeBuildingConfig::tool_use(), seed).with_max_steps(20);
        episode.reset().unwrap();
        let mut agent_rng = StdRng::seed_from_u64(seed);
        while !episode.is_done() {
            let action = BridgeBuilding::sample_action(&mut agent_rng);
            let before = player(&episode);
            let game = episode.game().unwrap();
            let into_water = action
                .direction()
                .and_then(|direction| before.offset(direction))
                .is_some_and(|target| game.water().is_water(target));

            let step = episode.step(action).unwrap();
            assert!(!step.info.is_set(FELL_INTO_WATER));
            assert!(step.reward >= 0.0);
            if into_water {
                assert_eq!(player(&episode), before);
                blocked += 1;
            }
        }
        assert_ne!(episode.state(), EpisodeState::Terminated(Outcome::Failure));
    }
    assert!(blocked > 0);
}

#[test]
fn tool_use_stay_leaves_the_board_alone() {
    for seed in 0..10 {
        let mut episode = Episode::<BridgeBuilding>::new(BridgeBuildingConfig::tool_use(), seed);
        let first = episode.reset().unwrap();
        let step = episode.step_encoded(&[4]).unwrap();
        assert_eq!(step.observation, first);
        assert_eq!(step.reward, 0.0);
        assert!(step.info.is_empty());
    }
}
