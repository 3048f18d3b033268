use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;

/// Storage key for a new profile picture: the client's file name, stripped to
/// a safe charset and prefixed with a random token.
pub fn picture_key(user_id: Uuid, original_name: Option<&str>) -> String {
    let name = original_name
        .map(sanitize_file_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "picture".to_string());
    format!("users/{}/{}_{}", user_id, Uuid::new_v4().simple(), name)
}

fn sanitize_file_name(raw: &str) -> String {
    // browsers may send a full client-side path
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .skip_while(|c| *c == '.')
        .take(MAX_NAME_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_keep_the_name() {
        let user = Uuid::new_v4();
        let a = picture_key(user, Some("me.png"));
        let b = picture_key(user, Some("me.png"));
        assert_ne!(a, b);
        assert!(a.starts_with(&format!("users/{}/", user)));
        assert!(a.ends_with("_me.png"));
    }

    #[test]
    fn strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(r"C:\Users\bob\my photo (1).jpg"), "myphoto1.jpg");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
    }

    #[test]
    fn falls_back_when_name_is_unusable() {
        let key = picture_key(Uuid::new_v4(), Some("///"));
        assert!(key.ends_with("_picture"));
        let key = picture_key(Uuid::new_v4(), None);
        assert!(key.ends_with("_picture"));
    }
}
