use super::*;
use serde::Serialize;

/// A flow with its exercises in sequence order.
#[derive(Debug, Clone, Serialize)]
pub struct FlowJson {
    #[serde(flatten)]
    pub flow: Flow,
    pub exercises: Vec<Exercise>,
}

pub fn get_exercises(conn: &PgConnection) -> Result<Vec<Exercise>> {
    use crate::schema::exercises;

    exercises::table
        .order(exercises::id.asc())
        .load(conn)
        .chain_err(|| "Couldn't load the exercises!")
}

pub fn get_exercise(conn: &PgConnection, exercise_id: i32) -> Result<Option<Exercise>> {
    use crate::schema::exercises;

    exercises::table
        .filter(exercises::id.eq(exercise_id))
        .get_result(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve exercise!")
}

pub fn get_exercise_by_slug(conn: &PgConnection, exercise_slug: &str) -> Result<Option<Exercise>> {
    use crate::schema::exercises;

    exercises::table
        .filter(exercises::slug.eq(exercise_slug))
        .get_result(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve exercise!")
}

fn flow_steps(conn: &PgConnection, flow: Flow) -> Result<FlowJson> {
    use crate::schema::{exercises, flow_exercises};

    let exercises: Vec<Exercise> = flow_exercises::table
        .inner_join(exercises::table)
        .filter(flow_exercises::flow_id.eq(flow.id))
        .order(flow_exercises::sequence_order.asc())
        .select(exercises::all_columns)
        .load(conn)
        .chain_err(|| "Couldn't load the exercises of a flow!")?;

    Ok(FlowJson { flow, exercises })
}

pub fn get_flows(conn: &PgConnection) -> Result<Vec<FlowJson>> {
    use crate::schema::flows;

    let flows: Vec<Flow> = flows::table
        .order(flows::id.asc())
        .load(conn)
        .chain_err(|| "Couldn't load the flows!")?;

    flows.into_iter()
        .map(|f| flow_steps(conn, f))
        .collect()
}

pub fn get_flow_by_slug(conn: &PgConnection, flow_slug: &str) -> Result<Option<FlowJson>> {
    use crate::schema::flows;

    let flow: Option<Flow> = flows::table
        .filter(flows::slug.eq(flow_slug))
        .get_result(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve flow!")?;

    match flow {
        Some(f) => Ok(Some(flow_steps(conn, f)?)),
        None => Ok(None),
    }
}

#[test]
fn test_flow_json_flattens_flow_fields() {
    let flow = Flow {
        id: 3,
        slug: "morning".into(),
        name: "Morning focus".into(),
        description: None,
        flow_type: Some("warmup".into()),
        duration: Some(300),
        difficulty_level: Some(1),
    };
    let json = serde_json::to_value(FlowJson { flow, exercises: vec![] }).unwrap();
    assert_eq!(json["slug"], "morning");
    assert_eq!(json["type"], "warmup");
    assert_eq!(json["exercises"], serde_json::json!([]));
}
