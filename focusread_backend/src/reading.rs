use super::*;
use chrono::offset::Utc;
use serde::Serialize;

pub fn get_library_books(conn: &PgConnection, user_id: i32) -> Result<Vec<LibraryItem>> {
    use crate::schema::library;

    library::table
        .filter(library::uploaded_by.eq(user_id).or(library::uploaded_by.is_null()))
        .order(library::id.asc())
        .load(conn)
        .chain_err(|| "Couldn't load the library!")
}

pub fn get_book(conn: &PgConnection, book_id: i32) -> Result<Option<LibraryItem>> {
    use crate::schema::library;

    library::table
        .filter(library::id.eq(book_id))
        .get_result(conn)
        .optional()
        .chain_err(|| "Error when trying to retrieve a library item!")
}

/// A user's own text, entered directly or extracted from an uploaded file.
#[derive(Debug, Clone)]
pub struct DocumentInput<'a> {
    pub title: &'a str,
    pub content: Option<&'a str>,
    pub file_url: Option<&'a str>,
    pub file_type: Option<&'a str>,
}

pub fn create_document(conn: &PgConnection, user_id: i32, doc: &DocumentInput) -> Result<LibraryItem> {
    use crate::schema::library;

    let is_pdf = doc.file_type == Some("pdf");
    let content = doc.content.unwrap_or("");

    if is_pdf && content.trim().is_empty() {
        return Err(invalid_input("A PDF document needs its text content; the file itself isn't read."));
    }

    let words = text::word_count(content);
    let new_doc = NewDocument {
        title: doc.title,
        description: if is_pdf { "User uploaded PDF" } else { "User uploaded document" },
        content,
        length: words as i32,
        estimated_time: text::estimated_minutes(words) as i32,
        file_url: doc.file_url,
        file_type: doc.file_type,
        uploaded_by: user_id,
        is_document: true,
    };

    let item: LibraryItem = diesel::insert_into(library::table)
        .values(&new_doc)
        .get_result(conn)
        .chain_err(|| "Couldn't create the document!")?;

    info!("User {} created document {} ({} words).", user_id, item.id, words);
    Ok(item)
}

pub fn get_book_progress(conn: &PgConnection, user_id: i32, book_id: i32) -> Result<Option<ReadingProgress>> {
    use crate::schema::reading_progress as rp;

    rp::table
        .filter(rp::user_id.eq(user_id))
        .filter(rp::book_id.eq(book_id))
        .get_result(conn)
        .optional()
        .chain_err(|| "Couldn't fetch the reading progress!")
}

pub fn upsert_reading_progress(conn: &PgConnection, values: &ReadingValues) -> Result<ReadingProgress> {
    use crate::schema::reading_progress as rp;

    diesel::insert_into(rp::table)
        .values(values)
        .on_conflict((rp::user_id, rp::book_id))
        .do_update()
        .set(values)
        .get_result(conn)
        .chain_err(|| "Couldn't save the reading progress!")
}

pub fn update_reading_progress(conn: &PgConnection,
                               user_id: i32,
                               book_id: i32,
                               words_flashed: i32,
                               word_count: i32,
                               last_position: i32)
                               -> Result<ReadingProgress> {
    upsert_reading_progress(conn, &ReadingValues {
        user_id,
        book_id,
        words_flashed,
        word_count,
        last_position,
        updated_at: Utc::now(),
    })
}

fn stored_position(conn: &PgConnection, user_id: i32, book_id: i32) -> Result<i32> {
    Ok(get_book_progress(conn, user_id, book_id)?.map_or(0, |p| p.last_position))
}

/// The words after the stored position. Empty when there's nothing left;
/// the stored position isn't corrected here.
pub fn get_remaining_content(conn: &PgConnection, user_id: i32, book_id: i32) -> Result<String> {
    let content = match get_book(conn, book_id)?.and_then(|b| b.content) {
        Some(ref c) if !c.trim().is_empty() => c.clone(),
        _ => {
            debug!("Book {} not found or has no content.", book_id);
            return Ok(String::new());
        }
    };
    let position = stored_position(conn, user_id, book_id)?.max(0) as usize;
    Ok(text::words_from(&content, position))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    pub content: String,
    pub word_count: usize,
    #[serde(rename = "last_position")]
    pub last_position: usize,
    pub remaining_content: String,
}

impl BookDetails {
    pub fn empty() -> Self {
        BookDetails {
            content: String::new(),
            word_count: 0,
            last_position: 0,
            remaining_content: String::new(),
        }
    }
}

/// Computes the details for a stored position. The flag tells whether the
/// position was out of range (negative, or at or past the end) and got reset
/// to the start.
pub fn book_details(content: &str, stored_position: i32) -> (BookDetails, bool) {
    let word_count = text::word_count(content);
    if word_count == 0 {
        return (BookDetails::empty(), false);
    }

    let reset = stored_position < 0 || stored_position as usize >= word_count;
    let last_position = if reset { 0 } else { stored_position as usize };

    let details = BookDetails {
        content: content.to_string(),
        word_count,
        last_position,
        remaining_content: text::words_from(content, last_position),
    };
    (details, reset)
}

/// Like `book_details`, but persists the reset of an out-of-range position.
pub fn compute_book_progress_details(conn: &PgConnection, user_id: i32, book_id: i32) -> Result<BookDetails> {
    use crate::schema::reading_progress as rp;

    let content = match get_book(conn, book_id)?.and_then(|b| b.content) {
        Some(c) => c,
        None => return Ok(BookDetails::empty()),
    };

    let position = stored_position(conn, user_id, book_id)?;
    let (details, reset) = book_details(&content, position);

    if reset {
        warn!("Reading position {} of user {} in book {} is outside its {} words. Resetting to 0.",
              position, user_id, book_id, details.word_count);
        let result = diesel::update(rp::table
                .filter(rp::user_id.eq(user_id))
                .filter(rp::book_id.eq(book_id)))
            .set((rp::last_position.eq(0), rp::updated_at.eq(Utc::now())))
            .execute(conn);
        if let Err(e) = result {
            error!("Couldn't reset the reading position: {}", e);
        }
    }

    Ok(details)
}

#[test]
fn test_book_details_within_range() {
    let content = "zero one two\n three four";
    let (details, reset) = book_details(content, 2);
    assert!(!reset);
    assert_eq!(details.word_count, 5);
    assert_eq!(details.last_position, 2);
    assert_eq!(details.remaining_content, "two three four");
    assert_eq!(details.content, content);

    let (again, reset) = book_details(content, details.last_position as i32);
    assert!(!reset);
    assert_eq!(again, details);
}

#[test]
fn test_book_details_resets_past_end() {
    let content = "a b c d";
    for &pos in &[4, 5, 400] {
        let (details, reset) = book_details(content, pos);
        assert!(reset);
        assert_eq!(details.last_position, 0);
        assert_eq!(details.remaining_content, "a b c d");
    }
}

#[test]
fn test_book_details_resets_negative_position() {
    let content = "a b c d";
    for &pos in &[-1, -400, i32::min_value()] {
        let (details, reset) = book_details(content, pos);
        assert!(reset);
        assert_eq!(details.last_position, 0);
        assert_eq!(details.remaining_content, "a b c d");
    }
    let (_, reset) = book_details(content, 0);
    assert!(!reset);
}

#[test]
fn test_book_details_empty_content() {
    assert_eq!(book_details("", 3), (BookDetails::empty(), false));
    assert_eq!(book_details(" \n ", 0), (BookDetails::empty(), false));
}

#[test]
fn test_book_details_json_shape() {
    let (details, _) = book_details("a b", 1);
    let json = serde_json::to_value(&details).unwrap();
    assert_eq!(json["wordCount"], 2);
    assert_eq!(json["last_position"], 1);
    assert_eq!(json["remainingContent"], "b");
}
