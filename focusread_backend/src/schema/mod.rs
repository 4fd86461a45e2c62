table! {
    badges (id) {
        id -> Int4,
        title -> Varchar,
        subtitle -> Nullable<Varchar>,
        icon_url -> Nullable<Varchar>,
        condition_type -> Nullable<Varchar>,
        condition_value -> Nullable<Int4>,
    }
}

table! {
    diagnostic (id) {
        id -> Int4,
        user_id -> Int4,
        reading_speed -> Nullable<Int4>,
        breathing_rate -> Nullable<Int4>,
        memory_score -> Nullable<Int4>,
        focus_score -> Nullable<Int4>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
        device_id -> Nullable<Varchar>,
    }
}

table! {
    exercises (id) {
        id -> Int4,
        name -> Varchar,
        slug -> Nullable<Varchar>,
        exercise_type -> Varchar,
        duration -> Int4,
        difficulty_level -> Int4,
        description -> Nullable<Text>,
        instructions -> Nullable<Jsonb>,
        required_level -> Int4,
        xp_reward -> Int4,
        focus_reward -> Int4,
        is_unlocked -> Bool,
    }
}

table! {
    flow_exercises (id) {
        id -> Int4,
        flow_id -> Int4,
        exercise_id -> Int4,
        sequence_order -> Int4,
    }
}

table! {
    flows (id) {
        id -> Int4,
        slug -> Varchar,
        name -> Varchar,
        description -> Nullable<Text>,
        flow_type -> Nullable<Varchar>,
        duration -> Nullable<Int4>,
        difficulty_level -> Nullable<Int4>,
    }
}

table! {
    library (id) {
        id -> Int4,
        title -> Varchar,
        description -> Nullable<Text>,
        content -> Nullable<Text>,
        length -> Nullable<Int4>,
        estimated_time -> Nullable<Int4>,
        file_url -> Nullable<Varchar>,
        file_type -> Nullable<Varchar>,
        uploaded_by -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        is_document -> Bool,
    }
}

table! {
    reading_progress (id) {
        id -> Int4,
        user_id -> Int4,
        book_id -> Int4,
        words_flashed -> Int4,
        word_count -> Int4,
        last_position -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    sart_results (id) {
        id -> Int4,
        user_id -> Int4,
        session_id -> Nullable<Int4>,
        total_trials -> Int4,
        correct_go_trials -> Int4,
        correct_no_go_trials -> Int4,
        commission_errors -> Int4,
        omission_errors -> Int4,
        average_reaction_time -> Float8,
        accuracy_percentage -> Float8,
        test_type -> Varchar,
        started_at -> Timestamptz,
        completed_at -> Timestamptz,
        duration_ms -> Int4,
        trial_details -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    session_content (id) {
        id -> Int4,
        user_id -> Int4,
        session_key -> Varchar,
        content_type -> Varchar,
        content_data -> Jsonb,
        duration -> Int4,
        created_at -> Timestamptz,
    }
}

table! {
    sessions (id) {
        id -> Int4,
        user_id -> Int4,
        exercise_id -> Nullable<Int4>,
        duration -> Int4,
        start_time -> Timestamptz,
        end_time -> Nullable<Timestamptz>,
        focus_increase -> Nullable<Int4>,
        xp_gained -> Nullable<Int4>,
        completed_exercises_count -> Int4,
        performance_metrics -> Nullable<Jsonb>,
        used_warmups -> Nullable<Bool>,
        questions_answered -> Nullable<Int4>,
        correct_answers -> Nullable<Int4>,
        score_percent -> Nullable<Int4>,
        quiz_details -> Nullable<Jsonb>,
    }
}

table! {
    user_badges (id) {
        id -> Int4,
        user_id -> Int4,
        badge_id -> Int4,
        unlocked_at -> Timestamptz,
    }
}

table! {
    user_progress (id) {
        id -> Int4,
        user_id -> Int4,
        level -> Int4,
        xp -> Int4,
        max_xp -> Int4,
        streak_count -> Int4,
        last_streak_update -> Nullable<Timestamptz>,
        total_points -> Int4,
        highest_streak -> Int4,
        diagnostic_step -> Nullable<Int4>,
        diagnostic_complete -> Nullable<Bool>,
        diagnostic_data -> Nullable<Jsonb>,
    }
}

table! {
    user_settings (id) {
        id -> Int4,
        user_id -> Int4,
        breathing_speed -> Float8,
        breathing_pause_duration -> Float8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        auth_provider -> Varchar,
        created_at -> Timestamptz,
        last_login -> Nullable<Timestamptz>,
        profile_completed -> Bool,
        display_name -> Nullable<Varchar>,
        timezone -> Varchar,
    }
}

joinable!(diagnostic -> users (user_id));
joinable!(flow_exercises -> exercises (exercise_id));
joinable!(flow_exercises -> flows (flow_id));
joinable!(reading_progress -> library (book_id));
joinable!(reading_progress -> users (user_id));
joinable!(sart_results -> users (user_id));
joinable!(session_content -> users (user_id));
joinable!(sessions -> users (user_id));
joinable!(user_badges -> badges (badge_id));
joinable!(user_badges -> users (user_id));
joinable!(user_progress -> users (user_id));
joinable!(user_settings -> users (user_id));

allow_tables_to_appear_in_same_query!(
    badges,
    diagnostic,
    exercises,
    flow_exercises,
    flows,
    library,
    reading_progress,
    sart_results,
    session_content,
    sessions,
    user_badges,
    user_progress,
    user_settings,
    users,
);
