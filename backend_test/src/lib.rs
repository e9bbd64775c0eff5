use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type, TypePath,
};

/// Run an async route test against a throwaway database.
///
/// Parameters are injected by type: [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], and any number of `crate::model::mongodb::Coll<T>`,
/// in that order. `#[backend_test(admin)]` and `#[backend_test(voter)]` create
/// an example account and log the client in before the test body runs.
///
/// The database is dropped afterwards even if the test panics. Tests are
/// ignored unless the `db-tests` feature is on, as they need a MongoDB
/// replica set for transactions.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let role = parse_macro_input!(args as Option<Ident>);

    let injected = match Injected::from_sig(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => return err.into_compile_error().into(),
    };
    let login = match role.as_ref().map(login_as).transpose() {
        Ok(login) => login.unwrap_or_default(),
        Err(err) => return err.into_compile_error().into(),
    };

    // The test keeps its name; the wrapped future gets a suffix.
    let name = item_fn.sig.ident.clone();
    let fut_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = fut_name.clone();

    let call_args = injected.call_args();
    let coll_idents = &injected.collection_idents;
    let coll_types = &injected.collection_types;

    quote! {
        #[test]
        #[cfg_attr(not(feature = "db-tests"), ignore = "needs a MongoDB replica set")]
        fn #name() {
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket = crate::rocket_for_db(db_client.clone(), &db_name).await;
                let rocket_client = rocket::local::asynchronous::Client::tracked(rocket)
                    .await
                    .unwrap();
                let db = db_client.database(&db_name);
                #login
                (rocket_client, db)
            }

            #item_fn

            // Setup and cleanup share one runtime; the test body gets its own,
            // since a panic inside `catch_unwind` poisons it.
            let runtime = || {
                rocket::tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()
                    .unwrap()
            };
            let outer = runtime();
            let (rocket_client, db) = outer.block_on(setup());

            let state = std::sync::Mutex::new((rocket_client, db.clone(), runtime()));
            let result = std::panic::catch_unwind(|| {
                let (rocket_client, db, inner) = state.into_inner().unwrap();
                #(
                    let #coll_idents = crate::model::mongodb::Coll::<#coll_types>::from_db(&db);
                )*
                inner.block_on(#fut_name(#(#call_args),*));
            });

            outer.block_on(async move { db.drop(None).await.unwrap() });
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// Insert the example account for `role` and post its credentials to the
/// matching login route.
fn login_as(role: &Ident) -> Result<TokenStream2, syn::Error> {
    let (model, credentials, route) = if role == "admin" {
        (
            quote!(crate::model::db::admin::NewAdmin),
            quote!(crate::model::api::admin::AdminCredentials::example1()),
            quote!(crate::api::auth::admin_login),
        )
    } else if role == "voter" {
        (
            quote!(crate::model::db::voter::NewVoter),
            quote!(crate::model::api::voter::VoterCredentials::example()),
            quote!(crate::api::auth::voter_login),
        )
    } else {
        return Err(syn::Error::new(
            role.span(),
            "Expected `admin`, `voter`, or no argument",
        ));
    };

    Ok(quote! {
        crate::model::mongodb::Coll::<#model>::from_db(&db)
            .insert_one(#model::example(), None)
            .await
            .unwrap();
        let status = rocket_client
            .post(uri!(#route))
            .header(rocket::http::ContentType::JSON)
            .body(rocket::serde::json::json!(#credentials).to_string())
            .dispatch()
            .await
            .status();
        assert_eq!(status, rocket::http::Status::Ok, "example login failed");
    })
}

/// What the test function asks to have passed in.
#[derive(Default)]
struct Injected {
    client: bool,
    db: bool,
    collection_idents: Vec<Ident>,
    collection_types: Vec<Ident>,
}

impl Injected {
    fn from_sig(sig: &Signature) -> Result<Self, syn::Error> {
        if sig.asyncness.is_none() {
            return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
        }

        let mut injected = Self::default();
        for input in &sig.inputs {
            let FnArg::Typed(pat_type) = input else {
                return Err(syn::Error::new(input.span(), "Test cannot take `self`"));
            };
            let (Pat::Ident(pat_ident), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty)
            else {
                return Err(unexpected(input));
            };

            match type_path.path.get_ident() {
                Some(ty) if ty == "Client" && !injected.client && !injected.db => {
                    injected.client = true;
                }
                Some(ty) if ty == "Database" && !injected.db => {
                    injected.db = true;
                }
                _ => match collection_type(type_path) {
                    Some(doc_type) => {
                        injected.collection_idents.push(pat_ident.ident.clone());
                        injected.collection_types.push(doc_type);
                    }
                    None => return Err(unexpected(input)),
                },
            }
        }
        Ok(injected)
    }

    fn call_args(&self) -> Vec<TokenStream2> {
        let mut args = vec![];
        if self.client {
            args.push(quote!(rocket_client));
        }
        if self.db {
            args.push(quote!(db));
        }
        args.extend(self.collection_idents.iter().map(|ident| quote!(#ident)));
        args
    }
}

/// `T` from a `Coll<T>` type path.
fn collection_type(type_path: &TypePath) -> Option<Ident> {
    let last = type_path.path.segments.last()?;
    if last.ident != "Coll" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &last.arguments else {
        return None;
    };
    match generics.args.first()? {
        GenericArgument::Type(Type::Path(inner)) => inner.path.get_ident().cloned(),
        _ => None,
    }
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected `client: Client`, then `db: Database`, then any `coll: Coll<T>`",
    )
}
