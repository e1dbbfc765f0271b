// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse_macro_input, AttributeArgs, ItemFn, Lit, LitStr, Meta, NestedMeta,
    ReturnType,
};

/// Arguments accepted by `#[vct_testcase(...)]`.
struct TestcaseArgs {
    schema: syn::Path,
    project_id: LitStr,
    testcase_id: LitStr,
    version: LitStr,
    markers: Vec<String>,
}

impl TestcaseArgs {
    fn parse(args: AttributeArgs) -> syn::Result<Self> {
        let mut schema = None;
        let mut project_id = None;
        let mut testcase_id = None;
        let mut version = None;
        let mut markers = Vec::new();

        for arg in args {
            let nv = match arg {
                NestedMeta::Meta(Meta::NameValue(nv)) => nv,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected `key = \"value\"`",
                    ))
                }
            };
            let value = match &nv.lit {
                Lit::Str(s) => s.clone(),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected a string literal",
                    ))
                }
            };
            let key = nv
                .path
                .get_ident()
                .map(|i| i.to_string())
                .unwrap_or_default();
            match key.as_str() {
                "schema" => schema = Some(value.parse::<syn::Path>()?),
                "project_id" => project_id = Some(value),
                "testcase_id" => testcase_id = Some(value),
                "version" => version = Some(value),
                "markers" => {
                    markers = value
                        .value()
                        .split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        &nv.path,
                        "unknown vct_testcase argument",
                    ))
                }
            }
        }

        let missing = |name: &str| {
            syn::Error::new(
                Span::call_site(),
                format!("vct_testcase requires a `{name}` argument"),
            )
        };
        Ok(Self {
            schema: schema.ok_or_else(|| missing("schema"))?,
            project_id: project_id.ok_or_else(|| missing("project_id"))?,
            testcase_id: testcase_id.ok_or_else(|| missing("testcase_id"))?,
            version: version.ok_or_else(|| missing("version"))?,
            markers,
        })
    }
}

/// The macro for labeling VCT testcases.
///
/// VCT testcase functions have the signature `fn test(ctx:
/// &vct_testcase::TestContext)`. The macro inserts the function body into a
/// wrapper function that returns a `vct_testcase::TestOutcome` and creates an
/// entry in the test case inventory that allows the VCT runner to enumerate
/// the test, validate its testcase data against `schema`, and report its
/// traceability ids:
///
/// ```ignore
/// #[vct_testcase(
///     schema = "uplink_schema",
///     project_id = "9321231",
///     testcase_id = "TC-2256",
///     version = "1.0",
///     markers = "all, esxi, api"
/// )]
/// fn test_uplink(ctx: &TestContext) { ... }
/// ```
#[proc_macro_attribute]
pub fn vct_testcase(attrib: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attrib as AttributeArgs);
    let item_fn = parse_macro_input!(input as ItemFn);

    let args = match TestcaseArgs::parse(args) {
        Ok(args) => args,
        Err(e) => return e.to_compile_error().into(),
    };

    if !matches!(item_fn.sig.output, ReturnType::Default) {
        return syn::Error::new_spanned(
            &item_fn.sig.output,
            "vct_testcase functions must not declare a return type",
        )
        .to_compile_error()
        .into();
    }

    // Build the inventory record for this test. The `module_path!()` in the
    // generated code allows the test case to report the fully-qualified path to
    // itself regardless of where it's located.
    let fn_ident = item_fn.sig.ident.clone();
    let fn_name = fn_ident.to_string();
    let TestcaseArgs { schema, project_id, testcase_id, version, markers } =
        args;
    let submit: proc_macro2::TokenStream = quote! {
        vct_testcase::inventory_submit! {
            vct_testcase::TestCase::new(
                module_path!(),
                #fn_name,
                vct_testcase::TestMetadata::new(
                    #project_id,
                    #testcase_id,
                    #version,
                    &[#(#markers),*],
                ),
                #schema,
                vct_testcase::TestFunction { f: #fn_ident }
            )
        }
    };

    // Rebuild the test body into an immediately-executed closure that returns
    // an `anyhow::Result`. This allows tests to use the `?` operator and to
    // `return Ok(())` to allow a test to pass early.
    let fn_vis = item_fn.vis.clone();
    let fn_sig = item_fn.sig.clone();
    let fn_block = item_fn.block;
    let remade_fn = quote! {
        #fn_vis #fn_sig -> vct_testcase::TestOutcome {
            match (|| -> vct_testcase::Result<()> {
                #fn_block
                Ok(())
            })() {
                Ok(()) => vct_testcase::TestOutcome::Passed,
                Err(e) => match e.downcast_ref::<vct_testcase::TestSkippedError>() {
                    Some(vct_testcase::TestSkippedError::TestSkipped(msg)) => {
                        vct_testcase::TestOutcome::Skipped(msg.clone())
                    }
                    None => vct_testcase::TestOutcome::Failed(Some(format!("{e:#}"))),
                },
            }
        }
    };

    quote! {
        #remade_fn

        #submit
    }
    .into()
}
