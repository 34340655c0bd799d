use std::borrow::Cow;

use proc_macro2::TokenStream;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{
    AngleBracketedGenericArguments, Attribute, Data, DataEnum, DataStruct, DeriveInput, Error,
    Field, GenericArgument, Ident, LitStr, Path, PathArguments, Token, Type, TypeGroup, TypeParen,
    TypePath,
};

macro_rules! ensure {
    ($predicate:expr, $span:expr, $message:expr $(,)?) => {
        if !$predicate {
            return Err(Error::new($span, $message));
        }
    };
}

//
// `DeriveInput`
//

pub(crate) fn optional(args: ContainerArgs, mut input: DeriveInput) -> Result<TokenStream, Error> {
    let policy = container_policy(&args)?;
    match &mut input.data {
        Data::Struct(DataStruct { fields, .. }) => {
            for field in fields {
                optional_loop_body(field, policy)?;
            }
        }
        Data::Enum(DataEnum { variants, .. }) => {
            for variant in variants {
                for field in &mut variant.fields {
                    optional_loop_body(field, policy)?;
                }
            }
        }
        Data::Union(union) => {
            return Err(Error::new(
                union.union_token.span,
                "`optional` does not support union",
            ));
        }
    }
    Ok(quote::quote!(#input))
}

fn optional_loop_body(field: &mut Field, policy: Policy) -> Result<(), Error> {
    if resolve(&field.ty)?.is_some() {
        annotate_field(field, policy)
    } else {
        for attr in &field.attrs {
            ensure!(
                Attr::try_parse(attr)?.is_none(),
                field.ty.span(),
                "`optional(...)` may only be applied to fields of type `Option<T>`",
            );
        }
        Ok(())
    }
}

/// Returns the element type `T` of a type equivalent to `Option<T>`, or `None` when the type is
/// not an `Option`.
fn resolve(type_: &Type) -> Result<Option<&Type>, Error> {
    match type_ {
        Type::Group(TypeGroup { elem, .. }) | Type::Paren(TypeParen { elem, .. }) => resolve(elem),
        Type::Path(TypePath { qself: None, path }) if is_option(path) => {
            element_type(path).map(Some)
        }
        _ => Ok(None),
    }
}

fn is_option(path: &Path) -> bool {
    match_path(path, &["std", "option", "Option"])
        || match_path(path, &["core", "option", "Option"])
}

fn element_type(path: &Path) -> Result<&Type, Error> {
    let segment = path
        .segments
        .last()
        .ok_or_else(|| Error::new(path.span(), "empty path"))?;
    match &segment.arguments {
        PathArguments::AngleBracketed(AngleBracketedGenericArguments { args, .. }) => {
            let mut iter = args.iter();
            match (iter.next(), iter.next()) {
                (Some(GenericArgument::Type(element)), None) => Ok(element),
                _ => Err(Error::new(
                    segment.span(),
                    "expect exactly one type argument: `Option<T>`",
                )),
            }
        }
        _ => Err(Error::new(
            segment.span(),
            "cannot determine the element type of `Option`: expect `Option<T>`",
        )),
    }
}

fn annotate_field(field: &mut Field, container_policy: Policy) -> Result<(), Error> {
    let mut skip = false;
    let mut with = None;
    let mut policy = None;
    let mut conflict = None;

    let mut i = 0;
    while i < field.attrs.len() {
        match Attr::try_parse(&field.attrs[i])? {
            Some(Attr(args)) => {
                for arg in args {
                    match arg {
                        AttrArg::Skip(ident) => {
                            ensure!(!skip, ident.span(), "duplicated `optional(skip)`");
                            skip = true;
                        }
                        AttrArg::With(ident, path) => {
                            ensure!(
                                with.is_none(),
                                ident.span(),
                                "duplicated `optional(with = \"...\")`",
                            );
                            with = Some(path);
                        }
                        AttrArg::Policy(ident, arg_policy) => {
                            ensure!(
                                policy.is_none(),
                                ident.span(),
                                "duplicated `optional(strict)` or `optional(lenient)`",
                            );
                            policy = Some(arg_policy);
                        }
                    }
                    ensure!(
                        !(skip && (with.is_some() || policy.is_some())),
                        field.attrs[i].span(),
                        "`optional(skip)` cannot be combined with other arguments",
                    );
                }
                field.attrs.remove(i);
            }
            None => {
                if let Err(error) = ensure_no_conflict(&field.attrs[i]) {
                    conflict.get_or_insert(error); // Keep the first conflict.
                }
                i += 1;
            }
        }
    }

    if skip {
        return Ok(());
    }

    if let Some(error) = conflict {
        return Err(error);
    }

    let policy = policy.unwrap_or(container_policy);
    let serde_with = match with {
        Some(path) => Cow::Owned(format!(
            "::optarray_serde::AsArray::<{}, {path}>",
            policy.type_path(),
        )),
        None => Cow::Borrowed(policy.module_path()),
    };
    // Only named fields may be missing; a tuple that is too short remains an error.
    field.attrs.push(if field.ident.is_some() {
        syn::parse_quote!(#[serde(default, with = #serde_with)])
    } else {
        syn::parse_quote!(#[serde(with = #serde_with)])
    });

    Ok(())
}

//
// `Policy`
//

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Policy {
    #[default]
    Lenient,
    Strict,
}

impl Policy {
    fn from_ident(name: &Ident) -> Option<Self> {
        if name == "lenient" {
            Some(Self::Lenient)
        } else if name == "strict" {
            Some(Self::Strict)
        } else {
            None
        }
    }

    fn type_path(self) -> &'static str {
        match self {
            Self::Lenient => "::optarray_serde::Lenient",
            Self::Strict => "::optarray_serde::Strict",
        }
    }

    fn module_path(self) -> &'static str {
        match self {
            Self::Lenient => "::optarray_serde::as_array",
            Self::Strict => "::optarray_serde::as_array::strict",
        }
    }
}

//
// `ContainerArg`
//

pub(crate) type ContainerArgs = Punctuated<ContainerArg, Token![,]>;

#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct ContainerArg(Ident, Policy);

impl Parse for ContainerArg {
    fn parse(input: ParseStream) -> Result<Self, Error> {
        let name = input.parse::<Ident>()?;
        match Policy::from_ident(&name) {
            Some(policy) => Ok(Self(name, policy)),
            None => Err(Error::new(name.span(), "unknown `optional` argument")),
        }
    }
}

fn container_policy(args: &ContainerArgs) -> Result<Policy, Error> {
    let mut policy = None;
    for ContainerArg(name, arg_policy) in args {
        ensure!(
            policy.is_none(),
            name.span(),
            "duplicated `optional(strict)` or `optional(lenient)`",
        );
        policy = Some(*arg_policy);
    }
    Ok(policy.unwrap_or_default())
}

//
// `Attr`
//

#[cfg_attr(test, derive(Debug, PartialEq))]
struct Attr(AttrArgs);

impl Attr {
    fn try_parse(attr: &Attribute) -> Result<Option<Self>, Error> {
        Ok(if match_path(attr.path(), &["optarray_serde", "optional"]) {
            Some(Self(attr.parse_args_with(AttrArgs::parse_terminated)?))
        } else {
            None
        })
    }
}

type AttrArgs = Punctuated<AttrArg, Token![,]>;

#[cfg_attr(test, derive(Debug, PartialEq))]
enum AttrArg {
    Skip(Ident),
    With(Ident, String),
    Policy(Ident, Policy),
}

impl Parse for AttrArg {
    fn parse(input: ParseStream) -> Result<Self, Error> {
        let name = input.parse::<Ident>()?;
        if name == "skip" {
            Ok(Self::Skip(name))
        } else if name == "with" {
            input.parse::<Token![=]>()?;
            Ok(Self::With(name, input.parse::<LitStr>()?.value()))
        } else if let Some(policy) = Policy::from_ident(&name) {
            Ok(Self::Policy(name, policy))
        } else {
            Err(Error::new(name.span(), "unknown `optional(...)` argument"))
        }
    }
}

//
// `SerdeAttrArg`
//

fn ensure_no_conflict(attr: &Attribute) -> Result<(), Error> {
    if attr.path().is_ident("serde") {
        for arg in attr.parse_args_with(SerdeAttrArgs::parse_terminated)? {
            arg.ensure_no_conflict()?;
        }
    }
    Ok(())
}

type SerdeAttrArgs = Punctuated<SerdeAttrArg, Token![,]>;

#[cfg_attr(test, derive(Debug, PartialEq))]
struct SerdeAttrArg {
    name: Ident,
    // In our use case, the argument value is ignored.
}

impl Parse for SerdeAttrArg {
    fn parse(input: ParseStream) -> Result<Self, Error> {
        let name = input.parse()?;
        if input.peek(Token![=]) {
            input.parse::<Token![=]>()?;
            input.parse::<LitStr>()?;
        } else if input.peek(syn::token::Paren) {
            // E.g., `rename(serialize = "...")`.
            let content;
            syn::parenthesized!(content in input);
            content.parse::<TokenStream>()?;
        }
        Ok(Self { name })
    }
}

impl SerdeAttrArg {
    fn ensure_no_conflict(&self) -> Result<(), Error> {
        // At the moment, we do not reconcile Serde attributes applied by you with those applied by
        // us; instead, we simply return an error.  `skip_serializing_if` is reserved because it
        // would encode `None` as a missing field rather than `[]`.
        const RESERVED: &[&str] = &[
            "default",
            "deserialize_with",
            "serialize_with",
            "skip_serializing_if",
            "with",
        ];
        ensure!(
            RESERVED.iter().all(|reserved| self.name != reserved),
            self.name.span(),
            format!("`optional(...)` conflict with `serde({})`", self.name),
        );
        Ok(())
    }
}

//
// Helpers.
//

fn match_path(path: &Path, expect: &[&str]) -> bool {
    // `path` should not contain angle brackets, except for the last segment.
    if !path
        .segments
        .iter()
        .rev()
        .skip(1)
        .all(|segment| segment.arguments.is_none())
    {
        return false;
    }

    fn segments(path: &Path) -> impl Iterator<Item = &Ident> {
        path.segments.iter().map(|segment| &segment.ident)
    }

    (path.leading_colon.is_none() && segments(path).eq([expect.last().expect("non-empty")]))
        || segments(path).eq(expect)
}
