//! Tests for display-name formatting and template simplification

use symcache::sources::{Demangler, NativeDemangler};
use symcache::symbols::{simplify_template_name, DisplayNames};

#[test]
fn test_short_template_content_is_unchanged()
{
    assert_eq!(simplify_template_name("std::vector<int>"), "std::vector<int>");
}

#[test]
fn test_name_without_brackets_is_unchanged()
{
    assert_eq!(simplify_template_name("plain_function"), "plain_function");
    assert_eq!(simplify_template_name("ns::Klass::method"), "ns::Klass::method");
}

#[test]
fn test_oversized_single_argument_collapses()
{
    let arg = "a".repeat(60);
    let name = format!("Base<{arg}>");
    assert_eq!(simplify_template_name(&name), "Base<...>");
}

#[test]
fn test_short_first_argument_is_kept()
{
    let name = "std::map<int, std::allocator<std::pair<const int, long> > >";
    assert_eq!(simplify_template_name(name), "std::map<int, ...>");
}

#[test]
fn test_oversized_first_argument_collapses()
{
    let first = "b".repeat(25);
    let name = format!("Base<{first}, int, int, int>");
    assert_eq!(simplify_template_name(&name), "Base<...>");
}

#[test]
fn test_nested_commas_do_not_split_the_first_argument()
{
    let name = format!("Base<G<aaa,bbb>, {}>", "c".repeat(30));
    assert_eq!(simplify_template_name(&name), "Base<G<aaa,bbb>, ...>");
}

#[test]
fn test_suffix_after_template_is_preserved()
{
    let arg = "a".repeat(40);
    let name = format!("ns::Foo<{arg}>::bar");
    assert_eq!(simplify_template_name(&name), "ns::Foo<...>::bar");
}

#[test]
fn test_disabled_display_names_pass_through()
{
    let names = DisplayNames::new(false, 1000);
    assert_eq!(names.display_name("_Z3foov"), "_Z3foov");
    names.queue("_Z3foov");
    assert!(!names.has_pending());
}

#[test]
fn test_miss_returns_raw_and_queues_once()
{
    let names = DisplayNames::new(true, 1000);
    assert_eq!(names.display_name("_Z3foov"), "_Z3foov");
    assert_eq!(names.display_name("_Z3foov"), "_Z3foov");
    assert!(names.has_pending());

    names.clear();
    assert!(!names.has_pending());
}

#[tokio::test]
async fn test_native_demangler_handles_cpp_and_rust()
{
    let demangler = NativeDemangler;
    let names = vec![
        "_Z3foov".to_string(),
        "_ZN4core3ptr13drop_in_place17h1234567890abcdefE".to_string(),
        "plain_c_symbol".to_string(),
    ];
    let display = demangler.demangle(&names).await.expect("native demangler is infallible");

    assert_eq!(display.len(), names.len());
    assert_eq!(display[0], "foo()");
    assert_eq!(display[1], "core::ptr::drop_in_place");
    assert_eq!(display[2], "plain_c_symbol");
}
