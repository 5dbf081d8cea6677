// End-to-end tests over the real websocket surface: authentication, room
// membership, the match lifecycle and the server-authoritative combat loop.

mod support;

use serde_json::json;
use std::time::Duration;
use support::{
    FINISHED_GRACE, authenticate, connect, ensure_server, join, recv_event, recv_event_matching,
    send, unique_room,
};

#[tokio::test]
async fn room_provisioning_is_idempotent() {
    let base_url = ensure_server();
    let client = reqwest::Client::new();
    let room_id = unique_room();

    let res = client
        .post(format!("{base_url}/rooms"))
        .json(&json!({ "room_id": room_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    // Same id again: the existing room is returned, not a second one.
    let res = client
        .post(format!("{base_url}/rooms"))
        .json(&json!({ "room_id": room_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let res = client
        .post(format!("{base_url}/rooms"))
        .json(&json!({ "room_id": "" }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn commands_are_rejected_before_authentication() {
    let base_url = ensure_server();
    let mut socket = connect(base_url).await;

    send(
        &mut socket,
        json!({ "event": "join", "data": { "roomId": unique_room() } }),
    )
    .await;

    let error = recv_event(&mut socket, "error").await;
    assert_eq!(error["code"], json!("unauthenticated"));
}

#[tokio::test]
async fn unknown_tokens_fail_authentication() {
    let base_url = ensure_server();
    let mut socket = connect(base_url).await;

    send(
        &mut socket,
        json!({ "event": "authenticate", "data": { "token": "not-a-token" } }),
    )
    .await;

    let data = recv_event(&mut socket, "authenticateResult").await;
    assert_eq!(data["ok"], json!(false));
}

#[tokio::test]
async fn duel_flow_runs_under_server_authority() {
    let base_url = ensure_server();
    let room_id = unique_room();

    let mut p1 = connect(base_url).await;
    let mut p2 = connect(base_url).await;
    authenticate(&mut p1, 101).await;
    authenticate(&mut p2, 102).await;

    // First joiner takes the left spawn and the host role.
    let joined = join(&mut p1, &room_id).await;
    assert_eq!(joined["reconnected"], json!(false));
    assert_eq!(joined["roster"].as_array().expect("roster").len(), 1);
    assert_eq!(joined["roster"][0]["x"], json!(25.0));

    let joined = join(&mut p2, &room_id).await;
    assert_eq!(joined["roster"].as_array().expect("roster").len(), 2);

    let notice = recv_event(&mut p1, "playerJoined").await;
    assert_eq!(notice["playerCount"], json!(2));
    assert_eq!(notice["player"]["playerId"], json!(102));
    assert_eq!(notice["player"]["x"], json!(775.0));

    // Only the host may start.
    send(&mut p2, json!({ "event": "start", "data": { "roomId": room_id } })).await;
    let error = recv_event(&mut p2, "error").await;
    assert_eq!(error["code"], json!("notHost"));

    send(&mut p1, json!({ "event": "start", "data": { "roomId": room_id } })).await;
    let started = recv_event(&mut p1, "started").await;
    assert_eq!(started["roster"].as_array().expect("roster").len(), 2);
    for entry in started["roster"].as_array().expect("roster") {
        assert_eq!(entry["hp"], json!(1000.0));
    }
    recv_event(&mut p2, "started").await;

    // P1 fires at P2's spawn; both see the cast, the caster alone sees the
    // cooldown start counting.
    send(
        &mut p1,
        json!({ "event": "castAttack", "data": { "x": 775.0, "y": 300.0 } }),
    )
    .await;
    let cast = recv_event(&mut p2, "attackCast").await;
    assert_eq!(cast["playerId"], json!(101));

    let cooldowns = recv_event_matching(&mut p1, "cooldowns", |data| {
        data["attack"].as_u64().is_some_and(|ms| ms > 0)
    })
    .await;
    assert!(cooldowns["attack"].as_u64().expect("millis") <= 3_700);

    // The projectile connects server-side: cost 50 left the attacker near
    // 950, so damage lands just above max(80, 950 * 0.2) = 190.
    let hit = recv_event(&mut p1, "hit").await;
    assert_eq!(hit["playerId"], json!(102));
    let hp_after = hit["hp"].as_f64().expect("hp");
    assert!(hp_after > 800.0 && hp_after < 815.0, "hp_after = {hp_after}");
    recv_event(&mut p2, "hit").await;

    // Movement is target-based: the opponent learns the target immediately,
    // positions stream in as the entity actually walks.
    send(&mut p2, json!({ "event": "move", "data": { "x": 700.0, "y": 400.0 } })).await;
    let target = recv_event(&mut p1, "moveTarget").await;
    assert_eq!(target["playerId"], json!(102));
    assert_eq!(target["x"], json!(700.0));

    let positions = recv_event_matching(&mut p2, "positionUpdate", |data| {
        data["players"]
            .as_array()
            .is_some_and(|players| players.iter().any(|p| p["playerId"] == json!(102)))
    })
    .await;
    let mover = positions["players"]
        .as_array()
        .expect("players")
        .iter()
        .find(|p| p["playerId"] == json!(102))
        .cloned()
        .expect("p2 moved");
    let x = mover["x"].as_f64().expect("x");
    assert!(x < 775.0, "walking left from spawn, got x = {x}");

    // The enemy's cooldowns are never revealed: P2 only ever sees its own,
    // which are all idle.
    let cooldowns = recv_event(&mut p2, "cooldowns").await;
    assert_eq!(cooldowns["attack"], json!(0));
    assert_eq!(cooldowns["dash"], json!(0));
    assert_eq!(cooldowns["buff"], json!(0));
}

#[tokio::test]
async fn dash_window_is_validated_server_side() {
    let base_url = ensure_server();
    let room_id = unique_room();

    let mut p1 = connect(base_url).await;
    let mut p2 = connect(base_url).await;
    authenticate(&mut p1, 301).await;
    authenticate(&mut p2, 302).await;
    join(&mut p1, &room_id).await;
    join(&mut p2, &room_id).await;
    send(&mut p1, json!({ "event": "start", "data": { "roomId": room_id } })).await;
    recv_event(&mut p1, "started").await;

    // 25 px from the left spawn: under the minimum window.
    send(&mut p1, json!({ "event": "dash", "data": { "x": 50.0, "y": 300.0 } })).await;
    let error = recv_event(&mut p1, "error").await;
    assert_eq!(error["code"], json!("dashOutOfRange"));

    // The rejection left the cooldown untouched, so a legal dash works now.
    send(&mut p1, json!({ "event": "dash", "data": { "x": 225.0, "y": 300.0 } })).await;
    let dashed = recv_event(&mut p1, "dashed").await;
    assert_eq!(dashed["playerId"], json!(301));
    assert_eq!(dashed["x"], json!(225.0));
}

#[tokio::test]
async fn disconnect_mid_match_awards_the_win() {
    let base_url = ensure_server();
    let room_id = unique_room();

    let mut p1 = connect(base_url).await;
    let mut p2 = connect(base_url).await;
    authenticate(&mut p1, 201).await;
    authenticate(&mut p2, 202).await;
    join(&mut p1, &room_id).await;
    join(&mut p2, &room_id).await;
    send(&mut p1, json!({ "event": "start", "data": { "roomId": room_id } })).await;
    recv_event(&mut p1, "started").await;

    drop(p2);

    let finish = recv_event(&mut p1, "finish").await;
    assert_eq!(finish["winnerId"], json!(201));
    assert_eq!(finish["reason"], json!("disconnect"));

    // Once the grace window passes the room is gone; commands against the
    // stale binding surface a not-found error.
    tokio::time::sleep(FINISHED_GRACE + Duration::from_millis(300)).await;
    send(&mut p1, json!({ "event": "move", "data": { "x": 400.0, "y": 300.0 } })).await;
    let error = recv_event(&mut p1, "error").await;
    assert_eq!(error["code"], json!("roomNotFound"));
}
