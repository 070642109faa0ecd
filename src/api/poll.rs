use rocket::{serde::json::Json, Route, State};

use crate::engine::PollEngine;
use crate::error::Result;
use crate::model::{
    api::{
        CastVoteInput, CastVoteOutput, LiveCountOutput, NewPollOutput, PollDescription,
        PollResultOutput, StatusOutput,
    },
    poll::{PollId, PollSpec},
};

pub fn routes() -> Vec<Route> {
    routes![
        create_poll,
        poll_details,
        live_count,
        cast_vote,
        poll_status,
        poll_result,
    ]
}

#[post("/api/poll/new", data = "<spec>", format = "json")]
fn create_poll(spec: Json<PollSpec>, engine: &State<PollEngine>) -> Result<Json<NewPollOutput>> {
    let id = engine.create_poll(spec.into_inner())?;
    Ok(Json(NewPollOutput { id }))
}

#[get("/api/poll?<id>")]
fn poll_details(id: PollId, engine: &State<PollEngine>) -> Result<Json<PollDescription>> {
    let details = engine.poll_details(id)?;
    Ok(Json(details.into()))
}

#[get("/api/poll/livedata?<id>")]
fn live_count(id: PollId, engine: &State<PollEngine>) -> Result<Json<LiveCountOutput>> {
    let snapshot = engine.live_count(id)?;
    Ok(Json(snapshot.into()))
}

#[post("/api/poll?<id>", data = "<vote>", format = "json")]
fn cast_vote(
    id: PollId,
    vote: Json<CastVoteInput>,
    engine: &State<PollEngine>,
) -> Result<Json<CastVoteOutput>> {
    let CastVoteInput { id: voter, option } = vote.into_inner();
    let receipt = engine.cast_vote(id, voter, &option)?;
    Ok(Json(CastVoteOutput {
        status: true,
        count: receipt.count,
        closed: receipt.closed,
    }))
}

#[get("/api/poll/status?<id>")]
fn poll_status(id: PollId, engine: &State<PollEngine>) -> Result<Json<StatusOutput>> {
    let closed = engine.status(id)?;
    Ok(Json(StatusOutput { status: closed }))
}

#[get("/api/poll/result?<id>")]
fn poll_result(id: PollId, engine: &State<PollEngine>) -> Result<Json<PollResultOutput>> {
    let result = engine.result(id)?;
    Ok(Json(result.into()))
}
