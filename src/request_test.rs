use super::*;

#[test]
fn present_drops_null_values_and_keeps_order() {
    let params = Params::new()
        .with("status", "hello")
        .with_opt("in_reply_to_status_id", None::<String>)
        .with_opt("lat", Some("37.7"))
        .with("long", "-122.4");

    assert_eq!(params.len(), 4);
    assert_eq!(params.to_pairs(), vec![("status", "hello"), ("lat", "37.7"), ("long", "-122.4")]);
}

#[test]
fn push_appends() {
    let mut params = Params::new();
    assert!(params.is_empty());
    params.push("track", Some("rust".into()));
    params.push("follow", None);
    assert_eq!(params.to_pairs(), vec![("track", "rust")]);
}

#[test]
fn from_iterator_marks_all_present() {
    let params: Params = [("id", "42"), ("trim_user", "true")].into_iter().collect();
    assert_eq!(params.to_pairs(), vec![("id", "42"), ("trim_user", "true")]);
}

#[test]
fn request_builders() {
    let req = Request::get("https://api.example/1.1/statuses/show.json").param("id", "42");
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.params.to_pairs(), vec![("id", "42")]);

    let req = Request::post("https://api.example/1.1/statuses/update.json");
    assert_eq!(req.method, Method::Post);
    assert!(req.params.is_empty());
}

#[test]
fn method_strings() {
    assert_eq!(Method::Get.as_str(), "GET");
    assert_eq!(Method::Post.to_string(), "POST");
}
