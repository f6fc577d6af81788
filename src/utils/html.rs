use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based sanitization for authored content (lesson descriptions,
/// exercise prompts): safe tags like <b> and <p> survive, <script>/<iframe>
/// and event-handler attributes are stripped before storage.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
